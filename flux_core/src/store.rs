//! Content-addressed object store.

use crate::commit::Commit;
use crate::error::{Error, Result};
use crate::hash::{Algorithm, Hash};
use crate::object::{ObjectEnvelope, ObjectType};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A flat content-addressed store: one file per object under `object/<digest>`.
#[derive(Debug, Clone)]
pub struct ContentStore {
    objects_dir: PathBuf,
    algorithm: Algorithm,
}

impl ContentStore {
    /// Create a store rooted at an existing objects directory.
    pub fn new<P: AsRef<Path>>(objects_dir: P, algorithm: Algorithm) -> Self {
        Self {
            objects_dir: objects_dir.as_ref().to_path_buf(),
            algorithm,
        }
    }

    /// Get the path to an object file given its hash.
    pub fn object_path(&self, hash: &Hash) -> PathBuf {
        self.objects_dir.join(hash.to_hex())
    }

    /// Get the digest algorithm used by this store.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Check whether an object exists.
    pub fn contains(&self, hash: &Hash) -> bool {
        self.object_path(hash).exists()
    }

    /// Store a blob and return its digest.
    ///
    /// Storing content that already exists is a no-op.
    pub fn put(&self, bytes: &[u8]) -> Result<Hash> {
        self.put_object(ObjectType::Blob, bytes)
    }

    /// Retrieve a blob by hash.
    pub fn get(&self, hash: &Hash) -> Result<Vec<u8>> {
        let (object_type, payload) = self.get_object(hash)?;
        if object_type != ObjectType::Blob {
            return Err(Error::invalid_object_type(
                ObjectType::Blob.as_str(),
                object_type.as_str(),
            ));
        }
        Ok(payload)
    }

    /// Store a commit record. The digest covers its serialized form.
    pub fn put_commit(&self, commit: &Commit) -> Result<Hash> {
        let bytes = commit.to_bytes()?;
        self.put_object(ObjectType::Commit, &bytes)
    }

    /// Retrieve and decode a commit record.
    pub fn get_commit(&self, hash: &Hash) -> Result<Commit> {
        let (object_type, payload) = self.get_object(hash)?;
        if object_type != ObjectType::Commit {
            return Err(Error::invalid_object_type(
                ObjectType::Commit.as_str(),
                object_type.as_str(),
            ));
        }
        Commit::from_bytes(&self.object_path(hash), &payload)
    }

    /// Count stored objects.
    pub fn object_count(&self) -> Result<usize> {
        let mut count = 0;
        for entry in fs::read_dir(&self.objects_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file()
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| Hash::from_hex(name).is_ok())
            {
                count += 1;
            }
        }
        Ok(count)
    }

    fn put_object(&self, object_type: ObjectType, payload: &[u8]) -> Result<Hash> {
        let hash = self.algorithm.digest(payload);

        // Check if object already exists (deduplication)
        let obj_path = self.object_path(&hash);
        if obj_path.exists() {
            debug!(hash = %hash, kind = object_type.as_str(), "object already stored");
            return Ok(hash);
        }

        let envelope = ObjectEnvelope::new(object_type, payload);
        write_atomic(&obj_path, &envelope.encode()?)?;
        debug!(hash = %hash, kind = object_type.as_str(), size = payload.len(), "stored object");

        Ok(hash)
    }

    fn get_object(&self, hash: &Hash) -> Result<(ObjectType, Vec<u8>)> {
        let obj_path = self.object_path(hash);

        if !obj_path.exists() {
            return Err(Error::not_found(hash.to_hex()));
        }

        let bytes = fs::read(&obj_path)?;
        let envelope = ObjectEnvelope::decode(&obj_path, &bytes)?;
        let payload = envelope.payload(&obj_path)?;

        // Verify hash matches payload (corruption detection)
        let computed_hash = self.algorithm.digest(&payload);
        if computed_hash != *hash {
            return Err(Error::corrupted_object(
                &obj_path,
                format!(
                    "Hash mismatch: expected {}, got {}",
                    hash.to_hex(),
                    computed_hash.to_hex()
                ),
            ));
        }

        Ok((envelope.object_type, payload))
    }
}

/// Write a file atomically using a temp file in the same directory.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let mut temp_file = tempfile::NamedTempFile::new_in(dir)?;
    temp_file.write_all(bytes)?;
    temp_file.flush()?;
    temp_file.persist(path)?;

    Ok(())
}
