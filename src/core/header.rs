use crate::compression::CompressionMethod;
use crate::error::{ArchiveError, Result};

pub const MAGIC: [u8; 4] = *b"AAF\x00";
pub const VERSION: u8 = 1;

/// Fixed header length; the payload region starts here
pub const HEADER_SIZE: u64 = 14;

/// Flag bit: every member payload is compressed
pub const FLAG_COMPRESSED: u8 = 0x01;

const CODEC_SHIFT: u8 = 1;
const CODEC_MASK: u8 = 0b0000_0110;

/// Archive header
///
/// Occupies the first 14 bytes of the container and records how the rest of
/// the file is to be interpreted, most importantly where the TOC begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Magic number: "AAF\x00"
    pub magic: [u8; 4],

    /// Format version
    pub version: u8,

    /// Bit 0: compressed, bits 1-2: codec id
    pub flags: u8,

    /// Absolute file offset of the TOC (the `member_count` field)
    pub toc_offset: u64,
}

impl Header {
    /// Create a header for an archive with the given compression method
    pub fn new(method: CompressionMethod) -> Self {
        let flags = match method.codec_id() {
            Some(id) => FLAG_COMPRESSED | (id << CODEC_SHIFT),
            None => 0,
        };

        Header {
            magic: MAGIC,
            version: VERSION,
            flags,
            toc_offset: HEADER_SIZE,
        }
    }

    pub fn is_compressed(&self) -> bool {
        self.flags & FLAG_COMPRESSED != 0
    }

    /// Compression method recorded in the flags
    pub fn compression(&self) -> Result<CompressionMethod> {
        if !self.is_compressed() {
            return Ok(CompressionMethod::None);
        }
        let id = (self.flags & CODEC_MASK) >> CODEC_SHIFT;
        CompressionMethod::from_codec_id(id).ok_or(ArchiveError::UnknownCodec(id))
    }

    /// Length of the payload region this header describes
    pub fn payload_len(&self) -> u64 {
        self.toc_offset - HEADER_SIZE
    }

    /// Validate the header magic, version and flags
    pub fn validate(&self) -> Result<()> {
        if self.magic != MAGIC {
            return Err(ArchiveError::InvalidMagic { found: self.magic });
        }

        // Exact match: there is only one layout so far
        if self.version != VERSION {
            return Err(ArchiveError::UnsupportedVersion(self.version));
        }

        self.compression()?;

        if self.toc_offset < HEADER_SIZE {
            return Err(ArchiveError::Truncated {
                context: "TOC offset (points into header)",
            });
        }

        Ok(())
    }

    /// Serialize header to bytes
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE as usize] {
        let mut bytes = [0u8; HEADER_SIZE as usize];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes[5] = self.flags;
        bytes[6..14].copy_from_slice(&self.toc_offset.to_le_bytes());
        bytes
    }

    /// Deserialize header from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE as usize {
            // Check the magic on whatever we have so a non-archive is reported as such
            let n = bytes.len().min(4);
            if bytes[..n] != MAGIC[..n] {
                let mut found = [0u8; 4];
                found[..n].copy_from_slice(&bytes[..n]);
                return Err(ArchiveError::InvalidMagic { found });
            }
            return Err(ArchiveError::Truncated { context: "header" });
        }

        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        let mut toc = [0u8; 8];
        toc.copy_from_slice(&bytes[6..14]);

        let header = Header {
            magic,
            version: bytes[4],
            flags: bytes[5],
            toc_offset: u64::from_le_bytes(toc),
        };

        header.validate()?;

        Ok(header)
    }
}
