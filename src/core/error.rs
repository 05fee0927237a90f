use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Failed to read {}: {source}", path.display())]
    ReadFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid magic number in header: {found:02x?}")]
    InvalidMagic { found: [u8; 4] },

    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(u8),

    #[error("Unknown compression codec id: {0}")]
    UnknownCodec(u8),

    #[error("Archive truncated while reading {context}")]
    Truncated { context: &'static str },

    #[error("Malformed entry '{name}': {reason}")]
    MalformedEntry { name: String, reason: String },

    #[error("Failed to read payload of '{name}': {source}")]
    PayloadRead {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Compression failed for '{name}': {reason}")]
    Compression { name: String, reason: String },

    #[error("Decompression failed for '{name}': {reason}")]
    Decompression { name: String, reason: String },

    #[error("Member not found in archive: {0}")]
    MemberNotFound(String),

    #[error("Duplicate member name: {0}")]
    DuplicateName(String),

    #[error("Invalid member name: {0}")]
    InvalidName(String),

    #[error("Too many members for the TOC: {0}")]
    TooManyMembers(usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArchiveError {
    /// True when the container itself is corrupt or not an archive
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            ArchiveError::InvalidMagic { .. }
                | ArchiveError::UnsupportedVersion(_)
                | ArchiveError::UnknownCodec(_)
                | ArchiveError::Truncated { .. }
                | ArchiveError::MalformedEntry { .. }
        )
    }

    /// True for a missing member or a missing input file
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ArchiveError::MemberNotFound(_) | ArchiveError::FileNotFound { .. }
        )
    }

    /// Map a short read onto `Truncated`, keeping other I/O errors as-is
    pub(crate) fn from_read(err: std::io::Error, context: &'static str) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            ArchiveError::Truncated { context }
        } else {
            ArchiveError::Io(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
