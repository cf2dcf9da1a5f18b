use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How many bytes each source image contributes to its data chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameLengthPolicy {
    /// Every image is stored whole with its true length
    #[default]
    Exact,
    /// Every frame is exactly the first image's length rounded up to a
    /// multiple of 4: longer files are cut, shorter ones zero-filled
    FixedCapacity,
}

/// One encoded image ready to be muxed
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Position in the output sequence
    pub index: usize,

    /// Where the payload came from
    pub path: PathBuf,

    /// Encoded bytes, stored verbatim
    pub payload: Vec<u8>,

    /// Size of the source file on disk
    pub source_len: u64,
}

impl VideoFrame {
    /// Length written to the chunk header
    pub fn declared_len(&self) -> usize {
        self.payload.len()
    }

    /// True when the payload does not hold the whole source file
    pub fn is_truncated(&self) -> bool {
        (self.payload.len() as u64) < self.source_len
    }
}

/// Facts taken from the first image that hold for the whole file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePlan {
    /// Byte length of the first image
    pub first_len: u64,

    /// `first_len` rounded up to the next multiple of 4
    pub capacity: usize,

    pub width: u32,
    pub height: u32,
}

/// Outcome of muxing a whole image sequence
#[derive(Debug, Clone, Copy)]
pub struct SourceReport {
    pub plan: SourcePlan,
    pub fps: u32,
    pub summary: crate::avi::MuxSummary,
}
