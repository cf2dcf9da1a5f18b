//! # MP4 Output Module
//!
//! H.264/MP4 output delegated to an external FFmpeg executable.

pub mod encoder;

pub use encoder::Mp4Encoder;
