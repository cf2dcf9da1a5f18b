//! # Conversion Module
//!
//! High-level entry point that turns an image sequence into a finished
//! video file on disk.

pub mod engine;

pub use engine::{ConversionEngine, EncodedVideo};
