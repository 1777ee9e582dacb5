//! The head pointer: digest of the latest commit, or unset.

use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::store::write_atomic;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Current head record version.
pub const HEAD_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct HeadRecord {
    version: u32,
    commit: Option<Hash>,
}

/// Reads and writes the `head` file.
#[derive(Debug, Clone)]
pub struct HeadRef {
    path: PathBuf,
}

impl HeadRef {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Current head commit, if any.
    ///
    /// A missing or blank file means no commits yet.
    pub fn read(&self) -> Result<Option<Hash>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        let record: HeadRecord = serde_json::from_str(&content)
            .map_err(|e| Error::invalid_head(&self.path, e.to_string()))?;

        if record.version != HEAD_VERSION {
            return Err(Error::invalid_head(
                &self.path,
                format!("Unsupported head version: {}", record.version),
            ));
        }

        Ok(record.commit)
    }

    /// Point head at `hash`.
    pub fn write(&self, hash: &Hash) -> Result<()> {
        self.write_record(Some(*hash))?;
        debug!(head = %hash, "head updated");
        Ok(())
    }

    /// Write an unset head (used by `init`).
    pub fn write_unset(&self) -> Result<()> {
        self.write_record(None)
    }

    fn write_record(&self, commit: Option<Hash>) -> Result<()> {
        let record = HeadRecord {
            version: HEAD_VERSION,
            commit,
        };
        write_atomic(&self.path, &serde_json::to_vec(&record)?)
    }
}
