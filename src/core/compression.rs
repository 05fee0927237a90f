//! Chunk codec for member payloads
//!
//! Compression is an archive-wide policy: when enabled, every member's stored
//! payload is the codec output and every extraction decodes it.
//!
//! **Framing**:
//! - Zlib: RFC 1950 stream (default, level 9)
//! - LZ4: block with a 4-byte little-endian uncompressed size prefix
//! - Zstd: a single zstd frame
//!
//! The codec id lives in header flag bits 1-2, see [`crate::header`].

use std::io::{Read, Write};
use thiserror::Error;

/// Upper bound on LZ4's expansion ratio, used to reject absurd size prefixes
const LZ4_MAX_RATIO: usize = 255;

/// Codec-level failure; callers attach the member name
#[derive(Error, Debug)]
#[error("{0}")]
pub struct CodecError(pub String);

/// Compression method for member payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    /// Stored as-is
    None,
    /// Zlib (deflate), matches archives produced by earlier tooling
    Zlib,
    /// LZ4 (fast, moderate ratio)
    Lz4,
    /// Zstd (slower, better ratio)
    Zstd,
}

impl CompressionMethod {
    /// Codec id written to the header flags, `None` for stored archives
    pub fn codec_id(self) -> Option<u8> {
        match self {
            CompressionMethod::None => None,
            CompressionMethod::Zlib => Some(0),
            CompressionMethod::Lz4 => Some(1),
            CompressionMethod::Zstd => Some(2),
        }
    }

    /// Convert from a header codec id
    pub fn from_codec_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(CompressionMethod::Zlib),
            1 => Some(CompressionMethod::Lz4),
            2 => Some(CompressionMethod::Zstd),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CompressionMethod::None => "none",
            CompressionMethod::Zlib => "zlib",
            CompressionMethod::Lz4 => "lz4",
            CompressionMethod::Zstd => "zstd",
        }
    }
}

impl std::str::FromStr for CompressionMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "stored" => Ok(CompressionMethod::None),
            "zlib" | "deflate" => Ok(CompressionMethod::Zlib),
            "lz4" => Ok(CompressionMethod::Lz4),
            "zstd" => Ok(CompressionMethod::Zstd),
            _ => Err(format!(
                "Invalid codec '{}'. Valid options: none, zlib, lz4, zstd",
                s
            )),
        }
    }
}

/// Compression configuration, fixed for the lifetime of a builder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionConfig {
    /// Compression method to use
    pub method: CompressionMethod,

    /// Codec level (zlib 0-9, zstd 1-22, ignored by LZ4)
    pub level: i32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        CompressionConfig::zlib()
    }
}

impl CompressionConfig {
    /// Create config with no compression
    pub fn none() -> Self {
        CompressionConfig {
            method: CompressionMethod::None,
            level: 0,
        }
    }

    /// Create config with zlib at maximum compression
    pub fn zlib() -> Self {
        CompressionConfig {
            method: CompressionMethod::Zlib,
            level: 9,
        }
    }

    /// Create config with LZ4 compression
    pub fn lz4() -> Self {
        CompressionConfig {
            method: CompressionMethod::Lz4,
            level: 0,
        }
    }

    /// Create config with Zstd compression
    pub fn zstd() -> Self {
        CompressionConfig {
            method: CompressionMethod::Zstd,
            level: 3,
        }
    }

    /// Same method, different level
    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.method != CompressionMethod::None
    }

    /// Compress a member payload
    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        compress(data, self.method, self.level)
    }
}

/// Compress data using the specified method
pub fn compress(data: &[u8], method: CompressionMethod, level: i32) -> Result<Vec<u8>, CodecError> {
    match method {
        CompressionMethod::None => Ok(data.to_vec()),
        CompressionMethod::Zlib => {
            let level = flate2::Compression::new(level.clamp(0, 9) as u32);
            let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), level);
            encoder
                .write_all(data)
                .map_err(|e| CodecError(format!("Zlib compression failed: {}", e)))?;
            encoder
                .finish()
                .map_err(|e| CodecError(format!("Zlib compression failed: {}", e)))
        }
        CompressionMethod::Lz4 => Ok(lz4_flex::compress_prepend_size(data)),
        CompressionMethod::Zstd => zstd::bulk::compress(data, level)
            .map_err(|e| CodecError(format!("Zstd compression failed: {}", e))),
    }
}

/// Decompress data using the specified method
///
/// When `expected_size` is known the decoded length must match it.
pub fn decompress(
    data: &[u8],
    method: CompressionMethod,
    expected_size: Option<usize>,
) -> Result<Vec<u8>, CodecError> {
    let decoded = match method {
        CompressionMethod::None => data.to_vec(),
        CompressionMethod::Zlib => {
            let mut decoded = Vec::with_capacity(expected_size.unwrap_or(data.len() * 2));
            flate2::read::ZlibDecoder::new(data)
                .read_to_end(&mut decoded)
                .map_err(|e| CodecError(format!("Zlib decompression failed: {}", e)))?;
            decoded
        }
        CompressionMethod::Lz4 => {
            check_lz4_prefix(data)?;
            lz4_flex::decompress_size_prepended(data)
                .map_err(|e| CodecError(format!("LZ4 decompression failed: {}", e)))?
        }
        CompressionMethod::Zstd => zstd::stream::decode_all(data)
            .map_err(|e| CodecError(format!("Zstd decompression failed: {}", e)))?,
    };

    if let Some(expected) = expected_size {
        if decoded.len() != expected {
            return Err(CodecError(format!(
                "Decoded {} bytes, expected {}",
                decoded.len(),
                expected
            )));
        }
    }

    Ok(decoded)
}

/// Reject size prefixes no LZ4 block of this length could decode to
fn check_lz4_prefix(data: &[u8]) -> Result<(), CodecError> {
    let prefix: [u8; 4] = data
        .get(..4)
        .and_then(|p| p.try_into().ok())
        .ok_or_else(|| CodecError("LZ4 block missing size prefix".to_string()))?;
    let claimed = u32::from_le_bytes(prefix) as usize;
    let limit = (data.len() - 4)
        .saturating_mul(LZ4_MAX_RATIO)
        .saturating_add(16);
    if claimed > limit {
        return Err(CodecError(format!(
            "LZ4 size prefix {} impossible for {} compressed bytes",
            claimed,
            data.len() - 4
        )));
    }
    Ok(())
}
