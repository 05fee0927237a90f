//! In-memory member index shared by the builder and the reader
//!
//! The index is the ordered list of `Entry` records (insertion order equals
//! storage order) plus a lookup table keyed by name checksum. Its serialized
//! form is the TOC at the end of the container.

use crate::checksum::name_checksum;
use crate::error::{ArchiveError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Read, Write};

/// Fixed part of a TOC record: checksum, offset, size, name length
pub const TOC_RECORD_FIXED_SIZE: u64 = 4 + 8 + 8 + 4;

/// Upper bound on entries preallocated from an untrusted member count
const MAX_PREALLOCATED_ENTRIES: usize = 4096;

/// One archive member
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entry {
    /// Lookup key, compared byte-for-byte
    pub name: String,

    /// Position of the stored payload within the payload region
    pub offset: u64,

    /// Stored (possibly compressed) payload length
    pub size: u64,

    /// CRC-32 of the name bytes
    pub name_checksum: u32,
}

impl Entry {
    /// End of this member's payload within the payload region
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }

    fn toc_record_len(&self) -> u64 {
        TOC_RECORD_FIXED_SIZE + self.name.len() as u64
    }
}

/// Ordered member index with a name-checksum lookup table
#[derive(Debug, Clone, Default)]
pub struct ArchiveIndex {
    entries: Vec<Entry>,
    by_checksum: HashMap<u32, Vec<usize>>,
    payload_len: u64,
}

impl ArchiveIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a member whose payload immediately follows the previous one
    pub fn push(&mut self, name: String, size: u64) -> &Entry {
        let entry = Entry {
            name_checksum: name_checksum(&name),
            offset: self.payload_len,
            size,
            name,
        };
        self.payload_len += size;
        self.insert(entry)
    }

    fn insert(&mut self, entry: Entry) -> &Entry {
        let idx = self.entries.len();
        self.payload_len = self.payload_len.max(entry.end());
        // Keyed on the recomputed checksum so a bad stored tag cannot hide a member
        self.by_checksum
            .entry(name_checksum(&entry.name))
            .or_default()
            .push(idx);
        self.entries.push(entry);
        &self.entries[idx]
    }

    /// First entry (in storage order) whose name equals `name`
    pub fn find(&self, name: &str) -> Option<&Entry> {
        self.by_checksum
            .get(&name_checksum(name))?
            .iter()
            .map(|&idx| &self.entries[idx])
            .find(|entry| entry.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Member names in storage order
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes covered by member payloads
    pub fn payload_len(&self) -> u64 {
        self.payload_len
    }

    /// True when every offset is the sum of the sizes before it
    pub fn is_contiguous(&self) -> bool {
        let mut expected = 0u64;
        self.entries.iter().all(|entry| {
            let ok = entry.offset == expected;
            expected = expected.saturating_add(entry.size);
            ok
        })
    }

    /// Serialized TOC length in bytes
    pub fn toc_len(&self) -> u64 {
        4 + self.entries.iter().map(Entry::toc_record_len).sum::<u64>()
    }

    /// Write the TOC: member count followed by one record per entry
    pub fn write_toc<W: Write>(&self, out: &mut W) -> Result<()> {
        let count = u32::try_from(self.entries.len())
            .map_err(|_| ArchiveError::TooManyMembers(self.entries.len()))?;
        out.write_all(&count.to_le_bytes())?;

        for entry in &self.entries {
            let name_len = u32::try_from(entry.name.len()).map_err(|_| {
                ArchiveError::InvalidName(format!("{} bytes exceeds the TOC limit", entry.name.len()))
            })?;
            out.write_all(&entry.name_checksum.to_le_bytes())?;
            out.write_all(&entry.offset.to_le_bytes())?;
            out.write_all(&entry.size.to_le_bytes())?;
            out.write_all(&name_len.to_le_bytes())?;
            out.write_all(entry.name.as_bytes())?;
        }

        Ok(())
    }

    /// Parse a TOC, checking every entry lies inside a payload region of `payload_len` bytes
    pub fn read_toc<R: Read>(input: &mut R, payload_len: u64) -> Result<Self> {
        let count = read_u32(input, "TOC member count")? as usize;
        let mut index = ArchiveIndex {
            entries: Vec::with_capacity(count.min(MAX_PREALLOCATED_ENTRIES)),
            ..Default::default()
        };

        for _ in 0..count {
            let stored_checksum = read_u32(input, "TOC record")?;
            let offset = read_u64(input, "TOC record")?;
            let size = read_u64(input, "TOC record")?;
            let name_len = read_u32(input, "TOC record")? as u64;

            let mut raw_name = Vec::new();
            input
                .by_ref()
                .take(name_len)
                .read_to_end(&mut raw_name)
                .map_err(|e| ArchiveError::from_read(e, "TOC member name"))?;
            if (raw_name.len() as u64) != name_len {
                return Err(ArchiveError::Truncated {
                    context: "TOC member name",
                });
            }

            let name = String::from_utf8(raw_name).map_err(|e| ArchiveError::MalformedEntry {
                name: String::from_utf8_lossy(e.as_bytes()).into_owned(),
                reason: "name is not valid UTF-8".to_string(),
            })?;

            let end = offset.checked_add(size);
            if end.map_or(true, |end| end > payload_len) {
                return Err(ArchiveError::MalformedEntry {
                    name,
                    reason: format!(
                        "payload {}+{} exceeds payload region of {} bytes",
                        offset, size, payload_len
                    ),
                });
            }

            if stored_checksum != name_checksum(&name) {
                tracing::warn!("Name checksum mismatch for TOC entry '{}'", name);
            }

            index.insert(Entry {
                name,
                offset,
                size,
                name_checksum: stored_checksum,
            });
        }

        Ok(index)
    }
}

impl<'a> IntoIterator for &'a ArchiveIndex {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn read_u32<R: Read>(input: &mut R, context: &'static str) -> Result<u32> {
    let mut buf = [0u8; 4];
    input
        .read_exact(&mut buf)
        .map_err(|e| ArchiveError::from_read(e, context))?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(input: &mut R, context: &'static str) -> Result<u64> {
    let mut buf = [0u8; 8];
    input
        .read_exact(&mut buf)
        .map_err(|e| ArchiveError::from_read(e, context))?;
    Ok(u64::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_index() -> ArchiveIndex {
        let mut index = ArchiveIndex::new();
        index.push("a.bin".to_string(), 3);
        index.push("b.bin".to_string(), 4);
        index.push("empty".to_string(), 0);
        index.push("c.bin".to_string(), 10);
        index
    }

    #[test]
    fn test_offsets_are_cumulative() {
        let index = sample_index();
        let offsets: Vec<u64> = index.iter().map(|e| e.offset).collect();
        assert_eq!(offsets, vec![0, 3, 7, 7]);
        assert_eq!(index.payload_len(), 17);
        assert!(index.is_contiguous());
    }

    #[test]
    fn test_find_by_name() {
        let index = sample_index();
        assert_eq!(index.find("b.bin").unwrap().offset, 3);
        assert!(index.find("B.BIN").is_none());
        assert!(index.find("b.bi").is_none());
        assert!(!index.contains("missing"));
    }

    #[test]
    fn test_duplicate_names_resolve_to_first() {
        let mut index = ArchiveIndex::new();
        index.push("dup".to_string(), 5);
        index.push("dup".to_string(), 7);
        assert_eq!(index.find("dup").unwrap().size, 5);
        assert_eq!(index.names(), vec!["dup", "dup"]);
    }

    #[test]
    fn test_toc_record_layout() {
        let mut index = ArchiveIndex::new();
        index.push("ab".to_string(), 9);

        let mut bytes = Vec::new();
        index.write_toc(&mut bytes).unwrap();

        assert_eq!(bytes.len() as u64, index.toc_len());
        assert_eq!(bytes.len(), 4 + 24 + 2);
        assert_eq!(&bytes[0..4], &1u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &name_checksum("ab").to_le_bytes());
        assert_eq!(&bytes[8..16], &0u64.to_le_bytes());
        assert_eq!(&bytes[16..24], &9u64.to_le_bytes());
        assert_eq!(&bytes[24..28], &2u32.to_le_bytes());
        assert_eq!(&bytes[28..30], b"ab");
    }

    #[test]
    fn test_toc_parse_restores_entries() {
        let index = sample_index();
        let mut bytes = Vec::new();
        index.write_toc(&mut bytes).unwrap();

        let parsed = ArchiveIndex::read_toc(&mut Cursor::new(bytes), index.payload_len()).unwrap();
        assert_eq!(parsed.entries(), index.entries());
        assert_eq!(parsed.find("c.bin").unwrap().offset, 7);
    }

    #[test]
    fn test_toc_truncated_name() {
        let mut index = ArchiveIndex::new();
        index.push("textures/long-name.dds".to_string(), 1);
        let mut bytes = Vec::new();
        index.write_toc(&mut bytes).unwrap();
        bytes.truncate(bytes.len() - 3);

        assert!(matches!(
            ArchiveIndex::read_toc(&mut Cursor::new(bytes), 1),
            Err(ArchiveError::Truncated { .. })
        ));
    }

    #[test]
    fn test_toc_entry_outside_payload_region() {
        let index = sample_index();
        let mut bytes = Vec::new();
        index.write_toc(&mut bytes).unwrap();

        assert!(matches!(
            ArchiveIndex::read_toc(&mut Cursor::new(bytes), 16),
            Err(ArchiveError::MalformedEntry { name, .. }) if name == "c.bin"
        ));
    }

    #[test]
    fn test_toc_huge_member_count_is_truncated_not_oom() {
        let bytes = u32::MAX.to_le_bytes().to_vec();
        assert!(matches!(
            ArchiveIndex::read_toc(&mut Cursor::new(bytes), 0),
            Err(ArchiveError::Truncated { .. })
        ));
    }

    #[test]
    fn test_empty_toc() {
        let index = ArchiveIndex::new();
        let mut bytes = Vec::new();
        index.write_toc(&mut bytes).unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 0]);

        let parsed = ArchiveIndex::read_toc(&mut Cursor::new(bytes), 0).unwrap();
        assert!(parsed.is_empty());
    }
}
