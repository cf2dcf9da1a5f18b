use crate::avi::chunks::{ids, IndexEntry, AVIIF_KEYFRAME, CHUNK_HEADER_LEN, INDEX_ENTRY_LEN};
use crate::error::{FormatError, Result};

/// Per-file bookkeeping of every data chunk written so far
///
/// Totals are kept in `u64` and only narrowed to the on-disk `u32` when a
/// header or index value is produced, so an overflow surfaces as a
/// `FormatError::SizeOverflow` instead of wrapping.
#[derive(Debug, Clone, Default)]
pub struct FrameLedger {
    lengths: Vec<u32>,
    payload_bytes: u64,
    largest: u32,
}

impl FrameLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, len: u32) {
        self.lengths.push(len);
        self.payload_bytes += u64::from(len);
        self.largest = self.largest.max(len);
    }

    pub fn frame_count(&self) -> usize {
        self.lengths.len()
    }

    pub fn payload_bytes(&self) -> u64 {
        self.payload_bytes
    }

    pub fn largest(&self) -> u32 {
        self.largest
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Bytes of data chunks (headers included) in the movi list
    pub fn movi_data_len(&self) -> u64 {
        self.frame_count() as u64 * u64::from(CHUNK_HEADER_LEN) + self.payload_bytes
    }

    /// `movi` LIST size: the type tag plus every data chunk
    pub fn movi_size(&self) -> Result<u32> {
        narrow("movi.size", 4 + self.movi_data_len())
    }

    /// `idx1` chunk size
    pub fn index_size(&self) -> Result<u32> {
        narrow("idx1.size", self.frame_count() as u64 * u64::from(INDEX_ENTRY_LEN))
    }

    pub fn total_frames(&self) -> Result<u32> {
        narrow("avih.totalFrames", self.frame_count() as u64)
    }

    /// idx1 records, offsets measured from the `movi` type tag
    pub fn index_entries(&self) -> Result<Vec<IndexEntry>> {
        let mut offset: u64 = 4;
        let mut entries = Vec::with_capacity(self.lengths.len());
        for &size in &self.lengths {
            entries.push(IndexEntry {
                id: ids::VIDEO_DATA,
                flags: AVIIF_KEYFRAME,
                offset: narrow("idx1.offset", offset)?,
                size,
            });
            offset += u64::from(size) + u64::from(CHUNK_HEADER_LEN);
        }
        Ok(entries)
    }
}

pub(crate) fn narrow(field: &'static str, value: u64) -> Result<u32> {
    u32::try_from(value).map_err(|_| FormatError::SizeOverflow { field, value }.into())
}
