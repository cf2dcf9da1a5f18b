//! # Reelwright
//!
//! Turn an ordered sequence of still images into a video file.
//!
//! Two output paths are provided:
//!
//! - **AVI**: JPEG images are stored verbatim as Motion-JPEG frames in a
//!   RIFF/AVI container written by hand. No re-encoding takes place.
//! - **MP4**: images are handed to an external FFmpeg executable and
//!   encoded as H.264.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use reelwright::{config::Config, ConversionEngine};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let mut config = Config::default();
//! config.output.fps = 12;
//!
//! let frames: Vec<PathBuf> = (1..=3).map(|i| PathBuf::from(format!("shot_{}.jpg", i))).collect();
//! let engine = ConversionEngine::new(config);
//! let video = engine.encode_images_to_avi(&frames, "timelapse.avi").await?;
//! println!("{} frames, {} bytes", video.frame_count, video.file_size);
//! # Ok(())
//! # }
//! ```
//!
//! ## Low-level muxing
//!
//! [`AviMuxer`] can be driven directly over any `Write + Seek` sink:
//!
//! ```rust
//! use std::io::Cursor;
//! use reelwright::avi::{AviMuxer, MuxerOptions};
//!
//! let mut muxer = AviMuxer::new(Cursor::new(Vec::new()), MuxerOptions::default());
//! muxer.init()?;
//! muxer.append_frame(&[0xFF, 0xD8, 0xFF, 0xD9])?;
//! let summary = muxer.finalize(320, 240, 24)?;
//! assert_eq!(summary.frame_count, 1);
//! # Ok::<(), reelwright::ReelError>(())
//! ```
//!
//! ## Architecture
//!
//! - [`avi`] - RIFF/AVI chunk encoding, muxer state machine and inspector
//! - [`source`] - Image discovery and the frame source adapter
//! - [`mp4`] - FFmpeg-backed MP4 output
//! - [`conversion`] - End-to-end conversion engine
//! - [`config`] - Configuration management

pub mod avi;
pub mod config;
pub mod conversion;
pub mod error;
pub mod mp4;
pub mod source;

// Re-export commonly used types for convenience
pub use crate::{
    avi::AviMuxer,
    config::Config,
    conversion::{ConversionEngine, EncodedVideo},
    error::{ErrorKind, ReelError, Result},
    source::FrameSourceAdapter,
};
