//! Container serialization
//!
//! Layout: 14-byte header, stored payloads in entry order, then the TOC.
//! The header's TOC offset is computed from serialized sizes before anything
//! is written.

use crate::builder::ArchiveBuilder;
use crate::error::{ArchiveError, Result};
use crate::header::{Header, HEADER_SIZE};
use crate::index::ArchiveIndex;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// What a completed write produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSummary {
    pub member_count: usize,

    /// Absolute offset of the TOC in the written container
    pub toc_offset: u64,

    /// Total container length in bytes
    pub total_len: u64,
}

/// Serializes a builder's members into a container
pub struct ArchiveWriter<'a> {
    header: Header,
    index: &'a ArchiveIndex,
    chunks: &'a [Vec<u8>],
}

impl<'a> ArchiveWriter<'a> {
    pub fn new(builder: &'a ArchiveBuilder) -> Self {
        let index = builder.index();
        let mut header = Header::new(builder.compression());
        header.toc_offset = HEADER_SIZE + index.payload_len();

        ArchiveWriter {
            header,
            index,
            chunks: builder.chunks(),
        }
    }

    /// Header that will be written, TOC offset included
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Serialize into any writer
    pub fn write_to<W: Write>(&self, out: W) -> Result<WriteSummary> {
        debug_assert_eq!(
            self.chunks.iter().map(|c| c.len() as u64).sum::<u64>(),
            self.index.payload_len()
        );

        let mut out = BufWriter::new(out);
        out.write_all(&self.header.to_bytes())?;
        for chunk in self.chunks {
            out.write_all(chunk)?;
        }
        self.index.write_toc(&mut out)?;
        out.flush()?;

        let summary = WriteSummary {
            member_count: self.index.len(),
            toc_offset: self.header.toc_offset,
            total_len: self.header.toc_offset + self.index.toc_len(),
        };
        debug!(
            "Serialized {} members, TOC at {}, {} bytes total",
            summary.member_count, summary.toc_offset, summary.total_len
        );
        Ok(summary)
    }

    /// Write the container to `path`
    ///
    /// The bytes go to a temporary file next to `path` which replaces it only
    /// once everything has been written and synced.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<WriteSummary> {
        let path = path.as_ref();
        info!("Writing archive to {:?}", path);

        let write_failure = |source: std::io::Error| ArchiveError::WriteFailure {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(dir).map_err(write_failure)?;

        let summary = self.write_to(temp.as_file_mut()).map_err(|e| match e {
            ArchiveError::Io(source) => write_failure(source),
            other => other,
        })?;
        temp.as_file().sync_all().map_err(write_failure)?;
        match_permissions(&temp, path).map_err(write_failure)?;
        temp.persist(path).map_err(|e| write_failure(e.error))?;

        info!(
            "Wrote {} members ({} bytes) to {:?}",
            summary.member_count, summary.total_len, path
        );
        Ok(summary)
    }
}

/// Give the temp file the permissions a plain create/truncate would have left
fn match_permissions(temp: &NamedTempFile, dest: &Path) -> std::io::Result<()> {
    if let Ok(existing) = std::fs::metadata(dest) {
        return temp.as_file().set_permissions(existing.permissions());
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))?;
    }

    Ok(())
}
