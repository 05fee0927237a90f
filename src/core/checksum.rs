//! CRC-32 checksums for member names and content
//!
//! Name checksums are carried in every TOC record so readers can prefilter
//! lookups before the exact byte comparison. Content checksums are computed
//! over raw (uncompressed) member bytes at build time and kept for diagnostics.

/// Incremental CRC-32 (IEEE) hasher
#[derive(Debug, Clone, Default)]
pub struct ChecksumHasher {
    inner: crc32fast::Hasher,
}

impl ChecksumHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    pub fn finalize(self) -> u32 {
        self.inner.finalize()
    }
}

/// One-shot CRC-32 of a byte buffer
pub fn crc32(bytes: &[u8]) -> u32 {
    crc32fast::hash(bytes)
}

/// Checksum stored in the TOC for a member name
pub fn name_checksum(name: &str) -> u32 {
    crc32(name.as_bytes())
}
