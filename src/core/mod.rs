//! Container format internals
//!
//! - [`header`] - 14-byte fixed header with magic, version, flags and TOC offset
//! - [`index`] - ordered member entries and the TOC encoding
//! - [`builder`] - in-memory accumulation of members
//! - [`writer`] - serialization to a container file
//! - [`reader`] - parsing, listing and extraction
//! - [`compression`] - zlib / LZ4 / Zstd chunk codec
//! - [`checksum`] - CRC-32 for names and content

pub mod builder;
pub mod checksum;
pub mod compression;
pub mod error;
pub mod header;
pub mod index;
pub mod reader;
pub mod writer;

pub use builder::{ArchiveBuilder, MemberStats};
pub use index::{ArchiveIndex, Entry};
pub use reader::ArchiveReader;
pub use writer::{ArchiveWriter, WriteSummary};
