//! Staging index: the ordered list of entries pending the next commit.
//!
//! The index is append-only until a commit clears it. The same path may appear
//! more than once; lookups always take the last matching entry.

use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::store::write_atomic;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Current index record version.
pub const INDEX_VERSION: u32 = 1;

/// A staged association between a path and a blob digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingEntry {
    pub path: String,
    pub hash: Hash,
}

impl StagingEntry {
    pub fn new(path: impl Into<String>, hash: Hash) -> Self {
        Self {
            path: path.into(),
            hash,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct IndexRecord {
    version: u32,
    entries: Vec<StagingEntry>,
}

/// The persisted staging index.
#[derive(Debug)]
pub struct StagingIndex {
    path: PathBuf,
    entries: Vec<StagingEntry>,
}

impl StagingIndex {
    /// Load the index from disk. A missing or blank file is an empty index.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Ok(Self {
                path,
                entries: Vec::new(),
            });
        }

        let content = fs::read_to_string(&path)?;
        let entries = Self::parse(&path, &content)?;

        Ok(Self { path, entries })
    }

    fn parse(path: &Path, content: &str) -> Result<Vec<StagingEntry>> {
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let record: IndexRecord = serde_json::from_str(content)
            .map_err(|e| Error::invalid_index(path, e.to_string()))?;

        if record.version != INDEX_VERSION {
            return Err(Error::invalid_index(
                path,
                format!("Unsupported index version: {}", record.version),
            ));
        }

        Ok(record.entries)
    }

    /// Append an entry and persist the index.
    pub fn stage(&mut self, path: impl Into<String>, hash: Hash) -> Result<()> {
        self.stage_all([StagingEntry::new(path, hash)])
    }

    /// Append several entries and persist the index once.
    pub fn stage_all<I: IntoIterator<Item = StagingEntry>>(&mut self, entries: I) -> Result<()> {
        for entry in entries {
            debug!(path = %entry.path, hash = %entry.hash, "staged");
            self.entries.push(entry);
        }
        self.save()
    }

    /// Current entries in staging order.
    pub fn snapshot(&self) -> &[StagingEntry] {
        &self.entries
    }

    /// Last staged entry for `path`.
    pub fn lookup(&self, path: &str) -> Option<&StagingEntry> {
        self.entries.iter().rev().find(|e| e.path == path)
    }

    /// Remove all entries and persist the empty index.
    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.save()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn save(&self) -> Result<()> {
        let record = IndexRecord {
            version: INDEX_VERSION,
            entries: self.entries.clone(),
        };
        write_atomic(&self.path, &serde_json::to_vec(&record)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Algorithm;
    use tempfile::TempDir;

    fn digest(data: &[u8]) -> Hash {
        Algorithm::Sha1.digest(data)
    }

    #[test]
    fn test_load_missing_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let index = StagingIndex::load(temp_dir.path().join("index")).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_stage_persists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("index");

        let mut index = StagingIndex::load(&path).unwrap();
        index.stage("a.txt", digest(b"a")).unwrap();
        index.stage("b.txt", digest(b"b")).unwrap();

        let reloaded = StagingIndex::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.snapshot()[0].path, "a.txt");
        assert_eq!(reloaded.snapshot()[1].path, "b.txt");
    }

    #[test]
    fn test_duplicates_kept_and_last_wins() {
        let temp_dir = TempDir::new().unwrap();
        let mut index = StagingIndex::load(temp_dir.path().join("index")).unwrap();

        index.stage("a.txt", digest(b"v1")).unwrap();
        index.stage("a.txt", digest(b"v2")).unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.lookup("a.txt").unwrap().hash, digest(b"v2"));
        assert!(index.lookup("missing.txt").is_none());
    }

    #[test]
    fn test_clear() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("index");

        let mut index = StagingIndex::load(&path).unwrap();
        index.stage("a.txt", digest(b"a")).unwrap();
        index.clear().unwrap();

        assert!(index.is_empty());
        assert!(StagingIndex::load(&path).unwrap().is_empty());
    }

    #[test]
    fn test_written_record_is_versioned() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("index");

        let mut index = StagingIndex::load(&path).unwrap();
        index.stage("a.txt", digest(b"hello\n")).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert_eq!(
            raw,
            r#"{"version":1,"entries":[{"path":"a.txt","hash":"f572d396fae9206628714fb2ce00f72e94f2258f"}]}"#
        );
    }

    #[test]
    fn test_bare_array_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("index");
        fs::write(
            &path,
            r#"[{"path":"a.txt","hash":"f572d396fae9206628714fb2ce00f72e94f2258f"}]"#,
        )
        .unwrap();

        let err = StagingIndex::load(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidIndex { .. }));
    }

    #[test]
    fn test_blank_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("index");
        fs::write(&path, "  \n").unwrap();

        assert!(StagingIndex::load(&path).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_index() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("index");

        fs::write(&path, "{not json").unwrap();
        let err = StagingIndex::load(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidIndex { .. }));

        fs::write(&path, r#"{"version":7,"entries":[]}"#).unwrap();
        let err = StagingIndex::load(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidIndex { .. }));

        fs::write(
            &path,
            r#"{"version":1,"entries":[{"path":"a.txt","hash":"nothex"}]}"#,
        )
        .unwrap();
        let err = StagingIndex::load(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidIndex { .. }));
    }
}
