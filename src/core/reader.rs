//! Read side of an archive
//!
//! Opening parses the header and the TOC only. Payload bytes are read on
//! demand, one member at a time, through a mutex-guarded source so a single
//! reader can serve concurrent lookups.

use crate::compression::{decompress, CompressionMethod};
use crate::error::{ArchiveError, Result};
use crate::header::{Header, HEADER_SIZE};
use crate::index::{ArchiveIndex, Entry};
use parking_lot::Mutex;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Parsed archive backed by a seekable byte source
pub struct ArchiveReader<R = File> {
    /// Seek + read pairs happen under this lock
    source: Mutex<R>,
    header: Header,
    compression: CompressionMethod,
    index: ArchiveIndex,
    path: Option<PathBuf>,
}

impl ArchiveReader<File> {
    /// Open an archive file
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use assetpack::ArchiveReader;
    ///
    /// let archive = ArchiveReader::open("assets.aaf")?;
    /// for name in archive.list() {
    ///     println!("{}", name);
    /// }
    /// archive.extract("textures/grass.dds", "grass.dds")?;
    /// # Ok::<(), assetpack::ArchiveError>(())
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening archive at {:?}", path);

        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ArchiveError::FileNotFound {
                path: path.to_path_buf(),
            },
            _ => ArchiveError::ReadFailure {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        let mut reader = Self::from_reader(file).map_err(|e| match e {
            ArchiveError::Io(source) => ArchiveError::ReadFailure {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        reader.path = Some(path.to_path_buf());
        Ok(reader)
    }
}

impl ArchiveReader<Cursor<Vec<u8>>> {
    /// Parse an archive held in memory
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }
}

impl<R: Read + Seek> ArchiveReader<R> {
    /// Parse the header and TOC from any seekable source
    pub fn from_reader(mut source: R) -> Result<Self> {
        let file_len = source.seek(SeekFrom::End(0))?;
        source.seek(SeekFrom::Start(0))?;

        let mut head = Vec::with_capacity(HEADER_SIZE as usize);
        source.by_ref().take(HEADER_SIZE).read_to_end(&mut head)?;
        let header = Header::from_bytes(&head)?;
        let compression = header.compression()?;

        if header.toc_offset > file_len {
            return Err(ArchiveError::Truncated {
                context: "TOC offset (past end of file)",
            });
        }

        source.seek(SeekFrom::Start(header.toc_offset))?;
        let index = ArchiveIndex::read_toc(&mut BufReader::new(&mut source), header.payload_len())?;

        debug!(
            "Parsed {} members, compression={}, TOC at {}",
            index.len(),
            compression.name(),
            header.toc_offset
        );

        Ok(ArchiveReader {
            source: Mutex::new(source),
            header,
            compression,
            index,
            path: None,
        })
    }

    /// Member names in TOC order
    pub fn list(&self) -> Vec<String> {
        self.index.names()
    }

    pub fn entries(&self) -> &[Entry] {
        self.index.entries()
    }

    /// First entry named `name`, if any
    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.index.find(name)
    }

    pub fn index(&self) -> &ArchiveIndex {
        &self.index
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn is_compressed(&self) -> bool {
        self.header.is_compressed()
    }

    pub fn compression(&self) -> CompressionMethod {
        self.compression
    }

    /// Path the archive was opened from, if it came from a file
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Stored payload of a member, without decoding
    pub fn read_stored(&self, name: &str) -> Result<Vec<u8>> {
        let entry = self
            .index
            .find(name)
            .ok_or_else(|| ArchiveError::MemberNotFound(name.to_string()))?;
        self.read_payload(entry)
    }

    /// Decoded contents of a member
    pub fn read(&self, name: &str) -> Result<Vec<u8>> {
        debug!("Reading {}", name);
        let stored = self.read_stored(name)?;
        if self.compression == CompressionMethod::None {
            return Ok(stored);
        }

        decompress(&stored, self.compression, None).map_err(|e| ArchiveError::Decompression {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }

    /// Write the decoded contents of a member to `output_path`
    ///
    /// Missing parent directories are created. Nothing is created at
    /// `output_path` unless the member was found and decoded.
    pub fn extract<P: AsRef<Path>>(&self, name: &str, output_path: P) -> Result<u64> {
        let output_path = output_path.as_ref();
        let data = self.read(name)?;

        let write_failure = |source: std::io::Error| ArchiveError::WriteFailure {
            path: output_path.to_path_buf(),
            source,
        };
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(write_failure)?;
            }
        }
        std::fs::write(output_path, &data).map_err(write_failure)?;

        debug!("Extracted {} ({} bytes) to {:?}", name, data.len(), output_path);
        Ok(data.len() as u64)
    }

    fn read_payload(&self, entry: &Entry) -> Result<Vec<u8>> {
        let payload_error = |source: std::io::Error| {
            if source.kind() != std::io::ErrorKind::UnexpectedEof {
                return ArchiveError::PayloadRead {
                    name: entry.name.clone(),
                    source,
                };
            }
            let location = match &self.path {
                Some(path) => format!(" in {}", path.display()),
                None => String::new(),
            };
            ArchiveError::MalformedEntry {
                name: entry.name.clone(),
                reason: format!(
                    "payload truncated{}: expected {} bytes at offset {}",
                    location, entry.size, entry.offset
                ),
            }
        };

        // Bounded by the payload region, which was checked against the source length at open
        let mut buffer = vec![0u8; entry.size as usize];

        let mut source = self.source.lock();
        source
            .seek(SeekFrom::Start(HEADER_SIZE + entry.offset))
            .map_err(payload_error)?;
        source.read_exact(&mut buffer).map_err(payload_error)?;

        Ok(buffer)
    }
}

impl<R> std::fmt::Debug for ArchiveReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveReader")
            .field("path", &self.path)
            .field("header", &self.header)
            .field("members", &self.index.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ArchiveBuilder, CompressionConfig};
    use tempfile::TempDir;

    fn build(compression: CompressionConfig, members: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = ArchiveBuilder::with_compression(compression);
        for (name, data) in members {
            builder.add_bytes(*name, data.to_vec()).unwrap();
        }
        let mut bytes = Vec::new();
        builder.write_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_scenario_two_members() {
        let bytes = build(
            CompressionConfig::none(),
            &[("a.bin", &[1, 2, 3][..]), ("b.bin", &[4, 5, 6, 7][..])],
        );
        let archive = ArchiveReader::from_bytes(bytes).unwrap();

        assert_eq!(archive.list(), vec!["a.bin", "b.bin"]);
        assert_eq!(archive.entries()[0].offset, 0);
        assert_eq!(archive.entries()[0].size, 3);
        assert_eq!(archive.entries()[1].offset, 3);
        assert_eq!(archive.entries()[1].size, 4);
        assert_eq!(archive.read("b.bin").unwrap(), vec![4, 5, 6, 7]);
        assert!(!archive.is_compressed());
    }

    #[test]
    fn test_list_is_repeatable() {
        let bytes = build(CompressionConfig::none(), &[("x", &b"1"[..]), ("y", &b"2"[..])]);
        let archive = ArchiveReader::from_bytes(bytes).unwrap();
        assert_eq!(archive.list(), archive.list());
        assert_eq!(archive.len(), 2);
    }

    #[test]
    fn test_compressed_read_decodes() {
        let data = b"compressible compressible compressible".repeat(20);
        let bytes = build(CompressionConfig::zlib(), &[("text", &data[..])]);
        let archive = ArchiveReader::from_bytes(bytes).unwrap();

        assert!(archive.is_compressed());
        assert_eq!(archive.compression(), CompressionMethod::Zlib);
        assert!(archive.read_stored("text").unwrap().len() < data.len());
        assert_eq!(archive.read("text").unwrap(), data);
    }

    #[test]
    fn test_missing_member() {
        let bytes = build(CompressionConfig::none(), &[("present", &b"yes"[..])]);
        let archive = ArchiveReader::from_bytes(bytes).unwrap();

        assert!(matches!(
            archive.read("absent"),
            Err(ArchiveError::MemberNotFound(name)) if name == "absent"
        ));
        assert!(archive.entry("absent").is_none());
    }

    #[test]
    fn test_extract_writes_file() {
        let dir = TempDir::new().unwrap();
        let bytes = build(CompressionConfig::lz4(), &[("data", &[7u8; 1000][..])]);
        let archive = ArchiveReader::from_bytes(bytes).unwrap();

        let out = dir.path().join("data.out");
        assert_eq!(archive.extract("data", &out).unwrap(), 1000);
        assert_eq!(std::fs::read(&out).unwrap(), vec![7u8; 1000]);
    }

    #[test]
    fn test_extract_missing_member_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let bytes = build(CompressionConfig::none(), &[("data", &b"abc"[..])]);
        let archive = ArchiveReader::from_bytes(bytes).unwrap();

        let out = dir.path().join("nothing.out");
        assert!(archive.extract("nope", &out).is_err());
        assert!(!out.exists());
    }

    #[test]
    fn test_open_records_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pack.aaf");
        std::fs::write(&path, build(CompressionConfig::none(), &[])).unwrap();

        let archive = ArchiveReader::open(&path).unwrap();
        assert_eq!(archive.path(), Some(path.as_path()));
        assert!(archive.is_empty());
    }

    #[test]
    fn test_extract_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let bytes = build(CompressionConfig::none(), &[("maps/e1m1.bsp", &b"level"[..])]);
        let archive = ArchiveReader::from_bytes(bytes).unwrap();

        let out = dir.path().join("out").join("maps").join("e1m1.bsp");
        assert_eq!(archive.extract("maps/e1m1.bsp", &out).unwrap(), 5);
        assert_eq!(std::fs::read(&out).unwrap(), b"level");
    }

    #[test]
    fn test_extract_write_failure_names_output() {
        let dir = TempDir::new().unwrap();
        let bytes = build(CompressionConfig::none(), &[("data", &b"abc"[..])]);
        let archive = ArchiveReader::from_bytes(bytes).unwrap();

        // A regular file where a parent directory is needed
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let out = blocker.join("data.out");

        let err = archive.extract("data", &out).unwrap_err();
        assert!(matches!(err, ArchiveError::WriteFailure { ref path, .. } if path == &out));
        assert!(err.to_string().contains("data.out"));
        assert!(!out.exists());
    }

    #[test]
    fn test_shrunk_source_names_member() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shrunk.aaf");
        let data = vec![0x5A; 4096];
        std::fs::write(
            &path,
            build(CompressionConfig::none(), &[("textures/grass.dds", &data[..])]),
        )
        .unwrap();

        let archive = ArchiveReader::open(&path).unwrap();
        std::fs::OpenOptions::new()
            .write(true)
            .open(&path)
            .unwrap()
            .set_len(100)
            .unwrap();

        let out = dir.path().join("grass.dds");
        let err = archive.extract("textures/grass.dds", &out).unwrap_err();
        assert!(matches!(err, ArchiveError::MalformedEntry { ref name, .. } if name == "textures/grass.dds"));
        assert!(err.to_string().contains("textures/grass.dds"));
        assert!(err.to_string().contains("shrunk.aaf"));
        assert!(!out.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_open_directory_is_read_failure() {
        let dir = TempDir::new().unwrap();
        let err = ArchiveReader::open(dir.path()).unwrap_err();
        assert!(matches!(err, ArchiveError::ReadFailure { ref path, .. } if path == dir.path()));
        assert!(err.to_string().contains(&*dir.path().to_string_lossy()));
    }

    #[test]
    fn test_open_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = ArchiveReader::open(dir.path().join("absent.aaf")).unwrap_err();
        assert!(matches!(err, ArchiveError::FileNotFound { .. }));
    }

    #[test]
    fn test_toc_offset_past_end() {
        let mut bytes = build(CompressionConfig::none(), &[("a", &b"123"[..])]);
        bytes[6..14].copy_from_slice(&1_000_000u64.to_le_bytes());
        assert!(matches!(
            ArchiveReader::from_bytes(bytes),
            Err(ArchiveError::Truncated { .. })
        ));
    }
}
