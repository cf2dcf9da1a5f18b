//! Read-back of files written by [`AviMuxer`](crate::avi::AviMuxer).
//!
//! Only the single-stream layout the muxer produces is understood; anything
//! else is reported as malformed.

use std::io::{self, Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::avi::chunks::{ids, FourCC, IndexEntry, INDEX_ENTRY_LEN};
use crate::error::{FormatError, ReelError, Result};

/// Header fields and index of an AVI file
#[derive(Debug, Clone)]
pub struct AviInspection {
    pub riff_size: u32,
    pub micro_sec_per_frame: u32,
    pub max_bytes_per_sec: u32,
    pub flags: u32,
    pub total_frames: u32,
    pub suggested_buffer_size: u32,
    pub width: u32,
    pub height: u32,
    pub codec: FourCC,
    pub scale: u32,
    pub rate: u32,
    pub stream_length: u32,
    pub stream_suggested_buffer_size: u32,
    pub compression: FourCC,
    pub bit_count: u16,
    pub size_image: u32,
    pub movi_size: u32,
    pub index: Vec<IndexEntry>,
    /// Absolute position of the `movi` type tag
    movi_start: u64,
}

fn malformed(reason: impl Into<String>) -> ReelError {
    FormatError::Malformed { reason: reason.into() }.into()
}

fn truncated(err: io::Error) -> ReelError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        malformed("file ends inside a chunk")
    } else {
        err.into()
    }
}

fn read_fourcc<R: Read>(r: &mut R) -> Result<FourCC> {
    let mut tag = [0u8; 4];
    r.read_exact(&mut tag).map_err(truncated)?;
    Ok(FourCC(tag))
}

fn expect_fourcc<R: Read>(r: &mut R, expected: FourCC) -> Result<()> {
    let found = read_fourcc(r)?;
    if found == expected {
        Ok(())
    } else {
        Err(malformed(format!("expected '{}', found '{}'", expected, found)))
    }
}

fn read_u32<R: Read>(r: &mut R) -> Result<u32> {
    r.read_u32::<LittleEndian>().map_err(truncated)
}

fn read_u16<R: Read>(r: &mut R) -> Result<u16> {
    r.read_u16::<LittleEndian>().map_err(truncated)
}

fn skip<R: Seek>(r: &mut R, bytes: i64) -> Result<()> {
    r.seek(SeekFrom::Current(bytes))?;
    Ok(())
}

impl AviInspection {
    pub fn read<R: Read + Seek>(r: &mut R) -> Result<Self> {
        r.seek(SeekFrom::Start(0))?;

        expect_fourcc(r, ids::RIFF)?;
        let riff_size = read_u32(r)?;
        expect_fourcc(r, ids::AVI)?;

        expect_fourcc(r, ids::LIST)?;
        let _hdrl_size = read_u32(r)?;
        expect_fourcc(r, ids::HDRL)?;

        expect_fourcc(r, ids::AVIH)?;
        let _avih_size = read_u32(r)?;
        let micro_sec_per_frame = read_u32(r)?;
        let max_bytes_per_sec = read_u32(r)?;
        let _padding = read_u32(r)?;
        let flags = read_u32(r)?;
        let total_frames = read_u32(r)?;
        let _initial_frames = read_u32(r)?;
        let _streams = read_u32(r)?;
        let suggested_buffer_size = read_u32(r)?;
        let width = read_u32(r)?;
        let height = read_u32(r)?;
        skip(r, 16)?;

        expect_fourcc(r, ids::LIST)?;
        let _strl_size = read_u32(r)?;
        expect_fourcc(r, ids::STRL)?;

        expect_fourcc(r, ids::STRH)?;
        let _strh_size = read_u32(r)?;
        expect_fourcc(r, ids::VIDS)?;
        let codec = read_fourcc(r)?;
        // flags, priority, language, initial frames
        skip(r, 12)?;
        let scale = read_u32(r)?;
        let rate = read_u32(r)?;
        let _start = read_u32(r)?;
        let stream_length = read_u32(r)?;
        let stream_suggested_buffer_size = read_u32(r)?;
        // quality, sample size, frame rect
        skip(r, 16)?;

        expect_fourcc(r, ids::STRF)?;
        let _strf_size = read_u32(r)?;
        // biSize, width, height, planes
        skip(r, 14)?;
        let bit_count = read_u16(r)?;
        let compression = read_fourcc(r)?;
        let size_image = read_u32(r)?;
        skip(r, 16)?;

        expect_fourcc(r, ids::LIST)?;
        let movi_size = read_u32(r)?;
        let movi_start = r.stream_position()?;
        expect_fourcc(r, ids::MOVI)?;

        r.seek(SeekFrom::Start(movi_start + u64::from(movi_size)))?;
        expect_fourcc(r, ids::IDX1)?;
        let index_size = read_u32(r)?;
        if index_size % INDEX_ENTRY_LEN != 0 {
            return Err(malformed(format!("idx1 size {} is not a multiple of 16", index_size)));
        }

        let mut index = Vec::with_capacity((index_size / INDEX_ENTRY_LEN) as usize);
        for _ in 0..index_size / INDEX_ENTRY_LEN {
            index.push(IndexEntry {
                id: read_fourcc(r)?,
                flags: read_u32(r)?,
                offset: read_u32(r)?,
                size: read_u32(r)?,
            });
        }

        Ok(Self {
            riff_size,
            micro_sec_per_frame,
            max_bytes_per_sec,
            flags,
            total_frames,
            suggested_buffer_size,
            width,
            height,
            codec,
            scale,
            rate,
            stream_length,
            stream_suggested_buffer_size,
            compression,
            bit_count,
            size_image,
            movi_size,
            index,
            movi_start,
        })
    }

    /// Walk the `movi` list using only the declared chunk sizes
    pub fn read_frames<R: Read + Seek>(&self, r: &mut R) -> Result<Vec<Vec<u8>>> {
        let end = self.movi_start + u64::from(self.movi_size);
        let mut pos = self.movi_start + 4;
        let mut frames = Vec::new();

        r.seek(SeekFrom::Start(pos))?;
        while pos < end {
            expect_fourcc(r, ids::VIDEO_DATA)?;
            let size = read_u32(r)?;
            let mut payload = vec![0u8; size as usize];
            r.read_exact(&mut payload).map_err(truncated)?;
            frames.push(payload);
            pos += 8 + u64::from(size);
        }

        if pos != end {
            return Err(malformed("last data chunk overruns the movi list"));
        }
        Ok(frames)
    }

    /// Frames per second as stored in the stream header
    pub fn fps(&self) -> f64 {
        if self.scale == 0 {
            0.0
        } else {
            f64::from(self.rate) / f64::from(self.scale)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avi::{AviMuxer, MuxerOptions};
    use crate::error::ErrorKind;
    use std::io::Cursor;

    fn sample() -> Vec<u8> {
        let mut muxer = AviMuxer::new(Cursor::new(Vec::new()), MuxerOptions::default());
        muxer.init().unwrap();
        muxer.append_frame(b"first").unwrap();
        muxer.append_frame(b"second!").unwrap();
        muxer.finalize(100, 50, 12).unwrap();
        muxer.into_inner().into_inner()
    }

    #[test]
    fn test_reads_header_fields() {
        let bytes = sample();
        let info = AviInspection::read(&mut Cursor::new(&bytes)).unwrap();

        assert_eq!(info.flags, 0x10);
        assert_eq!(info.max_bytes_per_sec, 25_000);
        assert_eq!(info.suggested_buffer_size, 100_000);
        assert_eq!(info.bit_count, 24);
        assert_eq!(info.size_image, 100 * 50 * 3);
        assert_eq!(info.fps(), 12.0);
        assert_eq!(info.index.iter().map(|e| e.size).collect::<Vec<_>>(), vec![5, 7]);
    }

    #[test]
    fn test_rejects_foreign_file() {
        let mut bytes = sample();
        bytes[8..12].copy_from_slice(b"WAVE");

        let err = AviInspection::read(&mut Cursor::new(&bytes)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FormatInvariant);
    }

    #[test]
    fn test_truncated_file_is_malformed() {
        let bytes = sample();
        let cut = &bytes[..bytes.len() - 10];

        let err = AviInspection::read(&mut Cursor::new(cut)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FormatInvariant);
    }
}
