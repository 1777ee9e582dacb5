//! Commit records.

use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::index::StagingEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current commit record version.
pub const COMMIT_VERSION: u32 = 1;

/// An immutable snapshot of the staging index linked to its parent.
///
/// `files` holds the whole index at commit time, in staging order, duplicates
/// included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub version: u32,
    pub message: String,
    pub parent: Option<Hash>,
    pub timestamp: DateTime<Utc>,
    pub files: Vec<StagingEntry>,
}

impl Commit {
    pub fn new(
        message: impl Into<String>,
        parent: Option<Hash>,
        timestamp: DateTime<Utc>,
        files: Vec<StagingEntry>,
    ) -> Self {
        Self {
            version: COMMIT_VERSION,
            message: message.into(),
            parent,
            timestamp,
            files,
        }
    }

    /// True for the root commit.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// The entry for `path` as of this commit (last match in staging order).
    pub fn file(&self, path: &str) -> Option<&StagingEntry> {
        self.files.iter().rev().find(|e| e.path == path)
    }

    /// Serialized form. The commit's digest is computed over these bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a commit payload read from `path`.
    pub fn from_bytes(path: &Path, bytes: &[u8]) -> Result<Self> {
        let commit: Commit = serde_json::from_slice(bytes)
            .map_err(|e| Error::corrupted_object(path, format!("Invalid commit record: {}", e)))?;

        if commit.version != COMMIT_VERSION {
            return Err(Error::corrupted_object(
                path,
                format!("Unsupported commit version: {}", commit.version),
            ));
        }

        Ok(commit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Algorithm;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap()
    }

    #[test]
    fn test_serialized_form() {
        let blob = Algorithm::Sha1.digest(b"hello\n");
        let commit = Commit::new("first", None, ts(), vec![StagingEntry::new("a.txt", blob)]);

        let json = String::from_utf8(commit.to_bytes().unwrap()).unwrap();
        assert_eq!(
            json,
            concat!(
                r#"{"version":1,"message":"first","parent":null,"timestamp":"2024-05-06T07:08:09Z","#,
                r#""files":[{"path":"a.txt","hash":"f572d396fae9206628714fb2ce00f72e94f2258f"}]}"#
            )
        );
    }

    #[test]
    fn test_bytes_roundtrip_is_stable() {
        let parent = Algorithm::Sha1.digest(b"parent");
        let commit = Commit::new("second", Some(parent), Utc::now(), Vec::new());

        let bytes = commit.to_bytes().unwrap();
        let decoded = Commit::from_bytes(Path::new("c"), &bytes).unwrap();
        assert_eq!(decoded, commit);
        assert_eq!(decoded.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_file_lookup_last_match_wins() {
        let v1 = Algorithm::Sha1.digest(b"v1");
        let v2 = Algorithm::Sha1.digest(b"v2");
        let commit = Commit::new(
            "dup",
            None,
            ts(),
            vec![
                StagingEntry::new("a.txt", v1),
                StagingEntry::new("b.txt", v1),
                StagingEntry::new("a.txt", v2),
            ],
        );

        assert_eq!(commit.file("a.txt").unwrap().hash, v2);
        assert_eq!(commit.file("b.txt").unwrap().hash, v1);
        assert!(commit.file("c.txt").is_none());
    }

    #[test]
    fn test_is_root() {
        assert!(Commit::new("root", None, ts(), Vec::new()).is_root());
        let parent = Algorithm::Sha1.digest(b"p");
        assert!(!Commit::new("child", Some(parent), ts(), Vec::new()).is_root());
    }

    #[test]
    fn test_from_bytes_rejects_bad_records() {
        assert!(Commit::from_bytes(Path::new("c"), b"hello\n").is_err());

        let future = br#"{"version":2,"message":"m","parent":null,"timestamp":"2024-05-06T07:08:09Z","files":[]}"#;
        let err = Commit::from_bytes(Path::new("c"), future).unwrap_err();
        assert!(matches!(err, Error::CorruptedObject { .. }));
    }
}
