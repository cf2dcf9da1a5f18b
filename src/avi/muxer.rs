use std::io::{Seek, SeekFrom, Write};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::avi::chunks::{
    ids, ChunkHeader, EncodeChunk, FourCC, FrameRect, HeaderList, ListHeader, MainHeader,
    RiffHeader, StreamFormat, StreamHeader, StreamList, AVIF_HASINDEX, CHUNK_HEADER_LEN,
    HEADER_RESERVE,
};
use crate::avi::ledger::{narrow, FrameLedger};
use crate::config::AviConfig;
use crate::error::{ErrorKind, FormatError, MuxError, ReelError, Result};

/// How the top-level `RIFF` size field is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiffSizing {
    /// `4 + hdrl + movi list header + movi.size`, the value older writers emit
    #[default]
    Legacy,
    /// File length minus the 8-byte RIFF chunk header, idx1 included
    Canonical,
}

/// Settings that shape the headers written by [`AviMuxer::finalize`]
#[derive(Debug, Clone)]
pub struct MuxerOptions {
    pub codec: FourCC,
    pub riff_sizing: RiffSizing,
    pub max_bytes_per_sec: u32,
    pub suggested_buffer_size: u32,
}

impl Default for MuxerOptions {
    fn default() -> Self {
        Self {
            codec: ids::MJPG,
            riff_sizing: RiffSizing::Legacy,
            max_bytes_per_sec: 25_000,
            suggested_buffer_size: 100_000,
        }
    }
}

impl MuxerOptions {
    pub fn from_config(config: &AviConfig) -> Result<Self> {
        Ok(Self {
            codec: config.codec_fourcc()?,
            riff_sizing: config.riff_sizing,
            max_bytes_per_sec: config.max_bytes_per_sec,
            suggested_buffer_size: config.suggested_buffer_size,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuxerState {
    Created,
    Initialized,
    Streaming,
    Finalized,
    /// An I/O error left the output in an unknown state
    Poisoned,
}

impl MuxerState {
    fn name(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Initialized => "initialized",
            Self::Streaming => "streaming",
            Self::Finalized => "finalized",
            Self::Poisoned => "poisoned",
        }
    }
}

/// Totals of a finished file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MuxSummary {
    pub frame_count: usize,
    pub payload_bytes: u64,
    pub file_len: u64,
}

/// Motion-JPEG AVI writer
///
/// Header space is reserved up front, frames are streamed into the `movi`
/// list, and once every frame is known `finalize` appends `idx1` and seeks
/// back to offset 0 to fill the reserved headers in. The writer must
/// therefore be seekable; the muxer owns it until [`AviMuxer::into_inner`].
pub struct AviMuxer<W: Write + Seek> {
    writer: W,
    options: MuxerOptions,
    ledger: FrameLedger,
    state: MuxerState,
}

impl<W: Write + Seek> AviMuxer<W> {
    pub fn new(writer: W, options: MuxerOptions) -> Self {
        Self {
            writer,
            options,
            ledger: FrameLedger::new(),
            state: MuxerState::Created,
        }
    }

    pub fn state(&self) -> MuxerState {
        self.state
    }

    pub fn ledger(&self) -> &FrameLedger {
        &self.ledger
    }

    pub fn frame_count(&self) -> usize {
        self.ledger.frame_count()
    }

    /// Give the writer back, typically after `finalize`
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Reserve header space and reset the ledger
    pub fn init(&mut self) -> Result<()> {
        self.expect_state("init", &[MuxerState::Created])?;

        self.ledger.clear();
        self.writer
            .seek(SeekFrom::Start(u64::from(HEADER_RESERVE)))
            .map_err(|e| self.poison(e.into()))?;

        self.state = MuxerState::Initialized;
        debug!("AVI muxer initialized, {} header bytes reserved", HEADER_RESERVE);
        Ok(())
    }

    /// Write one `00dc` chunk holding `payload` verbatim
    pub fn append_frame(&mut self, payload: &[u8]) -> Result<()> {
        self.expect_state("append a frame", &[MuxerState::Initialized, MuxerState::Streaming])?;

        let len = u32::try_from(payload.len()).map_err(|_| MuxError::InvalidArgument {
            details: format!("frame of {} bytes exceeds the 32-bit chunk size", payload.len()),
        })?;

        self.write_frame(len, payload).map_err(|e| self.poison(e))?;

        self.ledger.record(len);
        self.state = MuxerState::Streaming;
        Ok(())
    }

    /// Write `idx1` and backfill every header with the final totals
    pub fn finalize(&mut self, width: u32, height: u32, fps: u32) -> Result<MuxSummary> {
        self.expect_state("finalize", &[MuxerState::Initialized, MuxerState::Streaming])?;

        // Everything that can be rejected is computed before the first write
        let headers = self.build_headers(width, height, fps)?;
        let index = self.build_index()?;

        let file_len = self
            .write_trailer_and_headers(&index, &headers)
            .map_err(|e| self.poison(e))?;

        self.state = MuxerState::Finalized;
        info!(
            "AVI finalized: {} frames, {}x{} @ {} fps, {} bytes",
            self.ledger.frame_count(),
            width,
            height,
            fps,
            file_len
        );

        Ok(MuxSummary {
            frame_count: self.ledger.frame_count(),
            payload_bytes: self.ledger.payload_bytes(),
            file_len,
        })
    }

    fn expect_state(&self, operation: &'static str, allowed: &[MuxerState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(MuxError::InvalidState {
                operation,
                state: self.state.name(),
            }
            .into())
        }
    }

    fn poison(&mut self, err: ReelError) -> ReelError {
        if err.kind() == ErrorKind::IoFailure {
            self.state = MuxerState::Poisoned;
        }
        err
    }

    fn write_frame(&mut self, len: u32, payload: &[u8]) -> Result<()> {
        let header = ChunkHeader { id: ids::VIDEO_DATA, size: len };
        header.encode(&mut self.writer)?;
        self.writer.write_all(payload)?;
        Ok(())
    }

    fn build_headers(&self, width: u32, height: u32, fps: u32) -> Result<Vec<u8>> {
        if fps == 0 {
            return Err(MuxError::InvalidArgument {
                details: "fps must be at least 1".to_string(),
            }
            .into());
        }

        let rect_edge = |value: u32, name: &str| {
            i16::try_from(value).map_err(|_| MuxError::InvalidArgument {
                details: format!("{} {} does not fit the stream frame rectangle", name, value),
            })
        };
        let frame = FrameRect {
            left: 0,
            top: 0,
            right: rect_edge(width, "width")?,
            bottom: rect_edge(height, "height")?,
        };

        let size_image = u64::from(width) * u64::from(height) * 3;
        let size_image = u32::try_from(size_image).map_err(|_| MuxError::InvalidArgument {
            details: format!("{}x{} frame is too large for strf.sizeImage", width, height),
        })?;

        let total_frames = self.ledger.total_frames()?;
        let movi_size = self.ledger.movi_size()?;
        let riff_size = match self.options.riff_sizing {
            RiffSizing::Legacy => narrow(
                "riff.size",
                4 + u64::from(HeaderList::ENCODED_LEN)
                    + u64::from(ListHeader::ENCODED_LEN)
                    + u64::from(movi_size),
            )?,
            RiffSizing::Canonical => narrow(
                "riff.size",
                4 + u64::from(HeaderList::ENCODED_LEN)
                    + u64::from(CHUNK_HEADER_LEN)
                    + u64::from(movi_size)
                    + u64::from(CHUNK_HEADER_LEN)
                    + u64::from(self.ledger.index_size()?),
            )?,
        };

        let hdrl = HeaderList {
            avih: MainHeader {
                micro_sec_per_frame: 1_000_000 / fps,
                max_bytes_per_sec: self.options.max_bytes_per_sec,
                padding_granularity: 0,
                flags: AVIF_HASINDEX,
                total_frames,
                initial_frames: 0,
                streams: 1,
                suggested_buffer_size: self.options.suggested_buffer_size,
                width,
                height,
                reserved: [0; 4],
            },
            strl: StreamList {
                strh: StreamHeader {
                    stream_type: ids::VIDS,
                    codec: self.options.codec,
                    flags: 0,
                    priority: 0,
                    language: 0,
                    initial_frames: 0,
                    scale: 1,
                    rate: fps,
                    start: 0,
                    length: total_frames,
                    suggested_buffer_size: self.ledger.largest(),
                    quality: 10_000,
                    sample_size: 0,
                    frame,
                },
                strf: StreamFormat {
                    width,
                    height,
                    planes: 1,
                    bit_count: 24,
                    compression: self.options.codec,
                    size_image,
                    x_pels_per_meter: 0,
                    y_pels_per_meter: 0,
                    colors_used: 0,
                    colors_important: 0,
                },
            },
        };

        let mut bytes = Vec::with_capacity(HEADER_RESERVE as usize);
        RiffHeader { size: riff_size }.encode(&mut bytes)?;
        hdrl.encode(&mut bytes)?;
        ListHeader { size: movi_size, list_type: ids::MOVI }.encode(&mut bytes)?;
        Ok(bytes)
    }

    fn build_index(&self) -> Result<Vec<u8>> {
        let entries = self.ledger.index_entries()?;
        let header = ChunkHeader {
            id: ids::IDX1,
            size: self.ledger.index_size()?,
        };

        let mut bytes = Vec::with_capacity(header.size as usize + CHUNK_HEADER_LEN as usize);
        header.encode(&mut bytes)?;
        for entry in &entries {
            entry.encode(&mut bytes)?;
        }
        Ok(bytes)
    }

    fn write_trailer_and_headers(&mut self, index: &[u8], headers: &[u8]) -> Result<u64> {
        let expected = u64::from(HEADER_RESERVE) + self.ledger.movi_data_len();
        let actual = self.writer.stream_position()?;
        if actual != expected {
            return Err(FormatError::PositionMismatch { expected, actual }.into());
        }

        self.writer.write_all(index)?;
        let file_len = self.writer.stream_position()?;

        self.writer.seek(SeekFrom::Start(0))?;
        self.writer.write_all(headers)?;
        self.writer.seek(SeekFrom::End(0))?;
        self.writer.flush()?;

        debug!("idx1 written at {}, headers backfilled", expected);
        Ok(file_len)
    }
}
