//! # AVI Container Module
//!
//! Hand-built RIFF/AVI writer for Motion-JPEG frames.
//!
//! Layout of every file produced:
//!
//! ```text
//! RIFF 'AVI '
//!   LIST 'hdrl'
//!     avih
//!     LIST 'strl'
//!       strh
//!       strf
//!   LIST 'movi'
//!     00dc ...      one chunk per frame, unpadded
//!   idx1            one 16-byte entry per frame
//! ```

pub mod chunks;
pub mod inspect;
pub mod ledger;
pub mod muxer;

pub use chunks::{FourCC, IndexEntry, HEADER_RESERVE};
pub use inspect::AviInspection;
pub use ledger::FrameLedger;
pub use muxer::{AviMuxer, MuxSummary, MuxerOptions, MuxerState, RiffSizing};
