//! # Frame Source Module
//!
//! Turns an ordered list of encoded still images into frame payloads and
//! drives the AVI muxer with them.

pub mod adapter;
pub mod discover;
pub mod types;

pub use adapter::{probe_dimensions, FrameSourceAdapter};
pub use discover::{discover_images, expand_inputs, JPEG_EXTENSIONS, STILL_EXTENSIONS};
pub use types::{FrameLengthPolicy, SourcePlan, SourceReport, VideoFrame};
