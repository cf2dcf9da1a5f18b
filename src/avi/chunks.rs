//! On-disk records for every RIFF chunk the muxer writes.
//!
//! Each record encodes itself field by field in little-endian order. Nothing
//! here relies on in-memory struct layout, so the encoded lengths below are
//! exact regardless of target.

use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};

/// Four-character code identifying a chunk, list type or codec
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    /// Parse a four-byte ASCII string such as `"MJPG"` or `"AVI "`
    pub fn parse(s: &str) -> Option<Self> {
        let bytes: [u8; 4] = s.as_bytes().try_into().ok()?;
        if bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            Some(FourCC(bytes))
        } else {
            None
        }
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl std::fmt::Debug for FourCC {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FourCC(\"{}\")", self)
    }
}

impl std::fmt::Display for FourCC {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// Well-known tags
pub mod ids {
    use super::FourCC;

    pub const RIFF: FourCC = FourCC(*b"RIFF");
    pub const AVI: FourCC = FourCC(*b"AVI ");
    pub const LIST: FourCC = FourCC(*b"LIST");
    pub const HDRL: FourCC = FourCC(*b"hdrl");
    pub const AVIH: FourCC = FourCC(*b"avih");
    pub const STRL: FourCC = FourCC(*b"strl");
    pub const STRH: FourCC = FourCC(*b"strh");
    pub const STRF: FourCC = FourCC(*b"strf");
    pub const MOVI: FourCC = FourCC(*b"movi");
    pub const IDX1: FourCC = FourCC(*b"idx1");
    /// Compressed video data, stream 0
    pub const VIDEO_DATA: FourCC = FourCC(*b"00dc");
    pub const VIDS: FourCC = FourCC(*b"vids");
    pub const MJPG: FourCC = FourCC(*b"MJPG");
}

/// avih flag: file carries an idx1 index
pub const AVIF_HASINDEX: u32 = 0x10;
/// idx1 flag: entry is a key frame
pub const AVIIF_KEYFRAME: u32 = 0x10;

/// id + size
pub const CHUNK_HEADER_LEN: u32 = 8;
/// id + size + type
pub const LIST_HEADER_LEN: u32 = 12;
pub const INDEX_ENTRY_LEN: u32 = 16;

/// A record with a fixed encoded length
pub trait EncodeChunk {
    /// Total encoded length in bytes, including any chunk header
    const ENCODED_LEN: u32;

    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()>;
}

fn write_fourcc<W: Write>(w: &mut W, fourcc: FourCC) -> io::Result<()> {
    w.write_all(fourcc.as_bytes())
}

/// Plain chunk header: data chunks and the idx1 header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub id: FourCC,
    pub size: u32,
}

impl EncodeChunk for ChunkHeader {
    const ENCODED_LEN: u32 = CHUNK_HEADER_LEN;

    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write_fourcc(w, self.id)?;
        w.write_u32::<LittleEndian>(self.size)
    }
}

/// `RIFF` header with form type `AVI `
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiffHeader {
    pub size: u32,
}

impl EncodeChunk for RiffHeader {
    const ENCODED_LEN: u32 = LIST_HEADER_LEN;

    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write_fourcc(w, ids::RIFF)?;
        w.write_u32::<LittleEndian>(self.size)?;
        write_fourcc(w, ids::AVI)
    }
}

/// `LIST` header with no inline body; used for `movi`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListHeader {
    pub size: u32,
    pub list_type: FourCC,
}

impl EncodeChunk for ListHeader {
    const ENCODED_LEN: u32 = LIST_HEADER_LEN;

    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write_fourcc(w, ids::LIST)?;
        w.write_u32::<LittleEndian>(self.size)?;
        write_fourcc(w, self.list_type)
    }
}

/// `avih` main header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainHeader {
    pub micro_sec_per_frame: u32,
    pub max_bytes_per_sec: u32,
    pub padding_granularity: u32,
    pub flags: u32,
    pub total_frames: u32,
    pub initial_frames: u32,
    pub streams: u32,
    pub suggested_buffer_size: u32,
    pub width: u32,
    pub height: u32,
    pub reserved: [u32; 4],
}

impl EncodeChunk for MainHeader {
    const ENCODED_LEN: u32 = CHUNK_HEADER_LEN + 14 * 4;

    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write_fourcc(w, ids::AVIH)?;
        w.write_u32::<LittleEndian>(Self::ENCODED_LEN - CHUNK_HEADER_LEN)?;
        w.write_u32::<LittleEndian>(self.micro_sec_per_frame)?;
        w.write_u32::<LittleEndian>(self.max_bytes_per_sec)?;
        w.write_u32::<LittleEndian>(self.padding_granularity)?;
        w.write_u32::<LittleEndian>(self.flags)?;
        w.write_u32::<LittleEndian>(self.total_frames)?;
        w.write_u32::<LittleEndian>(self.initial_frames)?;
        w.write_u32::<LittleEndian>(self.streams)?;
        w.write_u32::<LittleEndian>(self.suggested_buffer_size)?;
        w.write_u32::<LittleEndian>(self.width)?;
        w.write_u32::<LittleEndian>(self.height)?;
        for value in self.reserved {
            w.write_u32::<LittleEndian>(value)?;
        }
        Ok(())
    }
}

/// Display rectangle inside `strh`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameRect {
    pub left: i16,
    pub top: i16,
    pub right: i16,
    pub bottom: i16,
}

/// `strh` stream header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    pub stream_type: FourCC,
    pub codec: FourCC,
    pub flags: u32,
    pub priority: u16,
    pub language: u16,
    pub initial_frames: u32,
    pub scale: u32,
    pub rate: u32,
    pub start: u32,
    pub length: u32,
    pub suggested_buffer_size: u32,
    pub quality: u32,
    pub sample_size: u32,
    pub frame: FrameRect,
}

impl EncodeChunk for StreamHeader {
    const ENCODED_LEN: u32 = CHUNK_HEADER_LEN + 56;

    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write_fourcc(w, ids::STRH)?;
        w.write_u32::<LittleEndian>(Self::ENCODED_LEN - CHUNK_HEADER_LEN)?;
        write_fourcc(w, self.stream_type)?;
        write_fourcc(w, self.codec)?;
        w.write_u32::<LittleEndian>(self.flags)?;
        w.write_u16::<LittleEndian>(self.priority)?;
        w.write_u16::<LittleEndian>(self.language)?;
        w.write_u32::<LittleEndian>(self.initial_frames)?;
        w.write_u32::<LittleEndian>(self.scale)?;
        w.write_u32::<LittleEndian>(self.rate)?;
        w.write_u32::<LittleEndian>(self.start)?;
        w.write_u32::<LittleEndian>(self.length)?;
        w.write_u32::<LittleEndian>(self.suggested_buffer_size)?;
        w.write_u32::<LittleEndian>(self.quality)?;
        w.write_u32::<LittleEndian>(self.sample_size)?;
        w.write_i16::<LittleEndian>(self.frame.left)?;
        w.write_i16::<LittleEndian>(self.frame.top)?;
        w.write_i16::<LittleEndian>(self.frame.right)?;
        w.write_i16::<LittleEndian>(self.frame.bottom)
    }
}

/// `strf` stream format (BITMAPINFOHEADER)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFormat {
    pub width: u32,
    pub height: u32,
    pub planes: u16,
    pub bit_count: u16,
    pub compression: FourCC,
    pub size_image: u32,
    pub x_pels_per_meter: u32,
    pub y_pels_per_meter: u32,
    pub colors_used: u32,
    pub colors_important: u32,
}

impl EncodeChunk for StreamFormat {
    const ENCODED_LEN: u32 = CHUNK_HEADER_LEN + 40;

    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let body_len = Self::ENCODED_LEN - CHUNK_HEADER_LEN;
        write_fourcc(w, ids::STRF)?;
        w.write_u32::<LittleEndian>(body_len)?;
        // biSize repeats the body length
        w.write_u32::<LittleEndian>(body_len)?;
        w.write_u32::<LittleEndian>(self.width)?;
        w.write_u32::<LittleEndian>(self.height)?;
        w.write_u16::<LittleEndian>(self.planes)?;
        w.write_u16::<LittleEndian>(self.bit_count)?;
        write_fourcc(w, self.compression)?;
        w.write_u32::<LittleEndian>(self.size_image)?;
        w.write_u32::<LittleEndian>(self.x_pels_per_meter)?;
        w.write_u32::<LittleEndian>(self.y_pels_per_meter)?;
        w.write_u32::<LittleEndian>(self.colors_used)?;
        w.write_u32::<LittleEndian>(self.colors_important)
    }
}

/// `LIST strl` holding one stream header and its format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamList {
    pub strh: StreamHeader,
    pub strf: StreamFormat,
}

impl EncodeChunk for StreamList {
    const ENCODED_LEN: u32 =
        LIST_HEADER_LEN + StreamHeader::ENCODED_LEN + StreamFormat::ENCODED_LEN;

    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write_fourcc(w, ids::LIST)?;
        w.write_u32::<LittleEndian>(Self::ENCODED_LEN - CHUNK_HEADER_LEN)?;
        write_fourcc(w, ids::STRL)?;
        self.strh.encode(w)?;
        self.strf.encode(w)
    }
}

/// `LIST hdrl` holding the main header and the single stream list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderList {
    pub avih: MainHeader,
    pub strl: StreamList,
}

impl EncodeChunk for HeaderList {
    const ENCODED_LEN: u32 = LIST_HEADER_LEN + MainHeader::ENCODED_LEN + StreamList::ENCODED_LEN;

    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write_fourcc(w, ids::LIST)?;
        w.write_u32::<LittleEndian>(Self::ENCODED_LEN - CHUNK_HEADER_LEN)?;
        write_fourcc(w, ids::HDRL)?;
        self.avih.encode(w)?;
        self.strl.encode(w)
    }
}

/// One idx1 record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub id: FourCC,
    pub flags: u32,
    /// Relative to the `movi` type tag, so the first chunk sits at 4
    pub offset: u32,
    pub size: u32,
}

impl EncodeChunk for IndexEntry {
    const ENCODED_LEN: u32 = INDEX_ENTRY_LEN;

    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write_fourcc(w, self.id)?;
        w.write_u32::<LittleEndian>(self.flags)?;
        w.write_u32::<LittleEndian>(self.offset)?;
        w.write_u32::<LittleEndian>(self.size)
    }
}

/// Bytes reserved ahead of the first data chunk
pub const HEADER_RESERVE: u32 =
    RiffHeader::ENCODED_LEN + HeaderList::ENCODED_LEN + ListHeader::ENCODED_LEN;
