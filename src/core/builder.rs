//! Build side of an archive
//!
//! Members are accumulated in memory in insertion order. Each successful add
//! appends exactly one index entry and one stored payload; a failed add leaves
//! the builder untouched.

use crate::checksum::{crc32, ChecksumHasher};
use crate::compression::{CompressionConfig, CompressionMethod};
use crate::error::{ArchiveError, Result};
use crate::index::{ArchiveIndex, Entry};
use crate::writer::{ArchiveWriter, WriteSummary};
use serde::Serialize;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Per-member facts known only at build time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemberStats {
    /// Length of the member before compression
    pub raw_size: u64,

    /// CRC-32 of the raw bytes
    pub content_checksum: u32,
}

/// Accumulates members and their stored payloads until written
#[derive(Debug)]
pub struct ArchiveBuilder {
    compression: CompressionConfig,
    index: ArchiveIndex,
    chunks: Vec<Vec<u8>>,
    stats: Vec<MemberStats>,
}

impl ArchiveBuilder {
    /// Create an empty archive; `compress` selects the default codec (zlib)
    pub fn new(compress: bool) -> Self {
        let compression = if compress {
            CompressionConfig::default()
        } else {
            CompressionConfig::none()
        };
        Self::with_compression(compression)
    }

    /// Create an empty archive with an explicit codec configuration
    pub fn with_compression(compression: CompressionConfig) -> Self {
        ArchiveBuilder {
            compression,
            index: ArchiveIndex::new(),
            chunks: Vec::new(),
            stats: Vec::new(),
        }
    }

    /// Add a file, using the path string as the member name
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use assetpack::ArchiveBuilder;
    ///
    /// let mut builder = ArchiveBuilder::new(true);
    /// builder.add_file("textures/grass.dds")?;
    /// builder.write("assets.aaf")?;
    /// # Ok::<(), assetpack::ArchiveError>(())
    /// ```
    pub fn add_file<P: AsRef<Path>>(&mut self, path: P) -> Result<&Entry> {
        let path = path.as_ref();
        let name = path.to_str().ok_or_else(|| {
            ArchiveError::InvalidName(format!("{} is not valid UTF-8", path.display()))
        })?;
        let name = name.to_string();
        self.add_file_as(path, name)
    }

    /// Add a file under an explicit member name
    pub fn add_file_as<P: AsRef<Path>>(&mut self, path: P, name: impl Into<String>) -> Result<&Entry> {
        let name = name.into();
        // Checked before reading so a rejected name costs no I/O
        self.check_name(&name)?;
        let (raw, content_checksum) = read_source(path.as_ref())?;
        self.append(name, raw, content_checksum)
    }

    /// Add an in-memory buffer as a member
    pub fn add_bytes(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Result<&Entry> {
        let name = name.into();
        let raw = data.into();
        self.check_name(&name)?;
        let content_checksum = crc32(&raw);
        self.append(name, raw, content_checksum)
    }

    /// Compress and append a member whose name has already been checked
    fn append(&mut self, name: String, raw: Vec<u8>, content_checksum: u32) -> Result<&Entry> {
        let stats = MemberStats {
            raw_size: raw.len() as u64,
            content_checksum,
        };

        let stored = if self.compression.is_enabled() {
            self.compression
                .compress(&raw)
                .map_err(|e| ArchiveError::Compression {
                    name: name.clone(),
                    reason: e.to_string(),
                })?
        } else {
            raw
        };

        debug!(
            "Adding '{}': {} bytes raw, {} bytes stored",
            name,
            stats.raw_size,
            stored.len()
        );

        self.stats.push(stats);
        self.chunks.push(stored);
        let size = self.chunks[self.chunks.len() - 1].len() as u64;
        Ok(self.index.push(name, size))
    }

    fn check_name(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(ArchiveError::InvalidName("name is empty".to_string()));
        }
        if u32::try_from(name.len()).is_err() {
            return Err(ArchiveError::InvalidName(format!(
                "{} bytes exceeds the TOC limit",
                name.len()
            )));
        }
        if self.index.contains(name) {
            return Err(ArchiveError::DuplicateName(name.to_string()));
        }
        if self.index.len() >= u32::MAX as usize {
            return Err(ArchiveError::TooManyMembers(self.index.len() + 1));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn is_compressed(&self) -> bool {
        self.compression.is_enabled()
    }

    pub fn compression(&self) -> CompressionMethod {
        self.compression.method
    }

    pub fn index(&self) -> &ArchiveIndex {
        &self.index
    }

    pub fn entries(&self) -> &[Entry] {
        self.index.entries()
    }

    /// Entries paired with their build-time stats, in storage order
    pub fn members(&self) -> impl Iterator<Item = (&Entry, MemberStats)> + '_ {
        self.index.iter().zip(self.stats.iter().copied())
    }

    /// Stored payloads, index-aligned with `entries()`
    pub(crate) fn chunks(&self) -> &[Vec<u8>] {
        &self.chunks
    }

    /// Write the archive to `path`, consuming the builder
    pub fn write<P: AsRef<Path>>(self, path: P) -> Result<WriteSummary> {
        ArchiveWriter::new(&self).write(path)
    }

    /// Serialize the archive into any writer, consuming the builder
    pub fn write_to<W: Write>(self, out: W) -> Result<WriteSummary> {
        ArchiveWriter::new(&self).write_to(out)
    }
}

/// Read a whole input file, checksumming it as it streams in
fn read_source(path: &Path) -> Result<(Vec<u8>, u32)> {
    let read_failure = |source: std::io::Error| ArchiveError::ReadFailure {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ArchiveError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => read_failure(e),
    })?;

    let capacity = file.metadata().map(|m| m.len() as usize).unwrap_or(0);
    let mut raw = Vec::with_capacity(capacity);
    let mut hasher = ChecksumHasher::new();
    let mut buf = [0u8; READ_CHUNK_SIZE];
    loop {
        let n = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(read_failure(e)),
        };
        hasher.update(&buf[..n]);
        raw.extend_from_slice(&buf[..n]);
    }

    Ok((raw, hasher.finalize()))
}
