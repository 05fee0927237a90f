//! # assetpack - Flat-File Asset Archive
//!
//! `assetpack` packs a set of named byte blobs into a single container file
//! with a trailing table of contents (TOC), then lists and extracts members
//! by name without scanning payload bytes.
//!
//! - **Single file** containers with a 14-byte header
//! - **Optional compression** (zlib, LZ4 or Zstd), archive-wide and transparent to extraction
//! - **Self-describing TOC** located through the header's TOC offset
//! - **CRC-32 name tags** for fast lookup prefiltering
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use assetpack::{ArchiveBuilder, ArchiveReader, Result};
//!
//! # fn main() -> Result<()> {
//! let mut builder = ArchiveBuilder::new(true);
//! builder.add_bytes("config/game.toml", b"difficulty = 3".to_vec())?;
//! builder.add_file("textures/grass.dds")?;
//! builder.write("assets.aaf")?;
//!
//! let archive = ArchiveReader::open("assets.aaf")?;
//! let config = archive.read("config/game.toml")?;
//! archive.extract("textures/grass.dds", "grass.dds")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Container Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ Header (14 bytes)                           │
//! │  - Magic: "AAF\x00"                         │
//! │  - Version: 1                               │
//! │  - Flags: bit0 compressed, bits1-2 codec    │
//! │  - TOC offset (u64 LE)                      │
//! ├─────────────────────────────────────────────┤
//! │ Payload region                              │
//! │  - Stored member bytes, entry order,        │
//! │    contiguous, no padding                   │
//! ├─────────────────────────────────────────────┤
//! │ TOC                                         │
//! │  - Member count (u32 LE)                    │
//! │  - Per member: name CRC-32, offset, size,   │
//! │    name length, name bytes                  │
//! └─────────────────────────────────────────────┘
//! ```

pub mod core;

// Re-export core modules internally so crate:: paths in core still work
#[allow(unused_imports)]
pub(crate) use self::core::{builder, checksum, compression, error, header, index, reader, writer};

pub use crate::core::{
    builder::{ArchiveBuilder, MemberStats},
    checksum::{crc32, name_checksum, ChecksumHasher},
    compression::{CodecError, CompressionConfig, CompressionMethod},
    error::{ArchiveError, Result},
    header::{Header, HEADER_SIZE},
    index::{ArchiveIndex, Entry},
    reader::ArchiveReader,
    writer::{ArchiveWriter, WriteSummary},
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Archive format magic number
pub const MAGIC: &[u8; 4] = &header::MAGIC;

/// Archive format version written by this crate
pub const FORMAT_VERSION: u8 = header::VERSION;
