//! Repository handle and commit creation.

use crate::commit::Commit;
use crate::config::RepoConfig;
use crate::error::{Error, Result};
use crate::hash::{Algorithm, Hash};
use crate::head::HeadRef;
use crate::index::{StagingEntry, StagingIndex};
use crate::store::ContentStore;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the repository directory inside the working directory.
pub const REPO_DIR: &str = ".flux";

const OBJECT_DIR: &str = "object";
const HEAD_FILE: &str = "head";
const INDEX_FILE: &str = "index";
const CONFIG_FILE: &str = "config";

/// An open repository.
///
/// Construct one per operation; nothing is cached between calls except the
/// layout and config. The staging index and head are re-read on every access.
#[derive(Debug)]
pub struct Repository {
    workdir: PathBuf,
    repo_dir: PathBuf,
    config: RepoConfig,
    store: ContentStore,
    head: HeadRef,
}

impl Repository {
    /// Initialize a repository in `workdir`.
    ///
    /// Creates:
    /// - `.flux/object/` for stored objects
    /// - `.flux/head` (unset)
    /// - `.flux/index` (empty)
    /// - `.flux/config` with version and algorithm
    ///
    /// Existing files are left untouched, so running `init` twice is harmless and
    /// keeps the algorithm chosen the first time.
    pub fn init<P: AsRef<Path>>(workdir: P, algorithm: Algorithm) -> Result<Self> {
        let workdir = workdir.as_ref();
        fs::create_dir_all(workdir)?;
        let repo_dir = workdir.join(REPO_DIR);

        fs::create_dir_all(repo_dir.join(OBJECT_DIR))?;

        let config_path = repo_dir.join(CONFIG_FILE);
        if !config_path.exists() {
            RepoConfig::new(algorithm).save(&config_path)?;
        }

        let head_path = repo_dir.join(HEAD_FILE);
        if !head_path.exists() {
            HeadRef::new(&head_path).write_unset()?;
        }

        let index_path = repo_dir.join(INDEX_FILE);
        if !index_path.exists() {
            StagingIndex::load(&index_path)?.clear()?;
        }

        info!(path = %repo_dir.display(), "initialized repository");
        Self::open(workdir)
    }

    /// Check whether `workdir` already contains a repository.
    pub fn exists<P: AsRef<Path>>(workdir: P) -> bool {
        workdir.as_ref().join(REPO_DIR).join(CONFIG_FILE).is_file()
    }

    /// Open an existing repository whose working directory is `workdir`.
    ///
    /// Validates the layout and reads the configuration.
    pub fn open<P: AsRef<Path>>(workdir: P) -> Result<Self> {
        let workdir = workdir.as_ref();
        let repo_dir = workdir.join(REPO_DIR);

        if !repo_dir.is_dir() {
            return Err(Error::invalid_repository(
                workdir,
                format!("{} directory not found (run `flux init`)", REPO_DIR),
            ));
        }

        let config_path = repo_dir.join(CONFIG_FILE);
        if !config_path.exists() {
            return Err(Error::invalid_repository(workdir, "config file not found"));
        }
        let config = RepoConfig::load(&config_path)?;

        let objects_dir = repo_dir.join(OBJECT_DIR);
        if !objects_dir.is_dir() {
            return Err(Error::invalid_repository(workdir, "object directory missing"));
        }

        let workdir = fs::canonicalize(workdir)?;
        let repo_dir = workdir.join(REPO_DIR);

        Ok(Self {
            store: ContentStore::new(repo_dir.join(OBJECT_DIR), config.algorithm),
            head: HeadRef::new(repo_dir.join(HEAD_FILE)),
            workdir,
            repo_dir,
            config,
        })
    }

    /// Find the repository containing `start`, searching parent directories.
    pub fn discover<P: AsRef<Path>>(start: P) -> Result<Self> {
        let start = fs::canonicalize(start.as_ref())?;

        let mut current = Some(start.as_path());
        while let Some(dir) = current {
            if Self::exists(dir) {
                debug!(workdir = %dir.display(), "discovered repository");
                return Self::open(dir);
            }
            current = dir.parent();
        }

        Err(Error::invalid_repository(
            &start,
            format!("no {} directory found here or in any parent", REPO_DIR),
        ))
    }

    /// Working directory (canonical).
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// The `.flux` directory.
    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    /// Digest algorithm used by this repository.
    pub fn algorithm(&self) -> Algorithm {
        self.config.algorithm
    }

    /// The object store.
    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    /// Load the staging index from disk.
    pub fn index(&self) -> Result<StagingIndex> {
        StagingIndex::load(self.repo_dir.join(INDEX_FILE))
    }

    /// Current head commit, if any.
    pub fn head(&self) -> Result<Option<Hash>> {
        self.head.read()
    }

    /// Staged entries in staging order.
    pub fn status(&self) -> Result<Vec<StagingEntry>> {
        Ok(self.index()?.snapshot().to_vec())
    }

    /// Blob content by digest.
    pub fn cat(&self, hash: &Hash) -> Result<Vec<u8>> {
        self.store.get(hash)
    }

    /// Load a commit by digest.
    pub fn find_commit(&self, hash: &Hash) -> Result<Commit> {
        self.store.get_commit(hash)
    }

    /// Resolve a user-supplied revision: `HEAD` or a full hex digest.
    pub fn resolve(&self, rev: &str) -> Result<Hash> {
        if rev.eq_ignore_ascii_case("head") {
            return self.head()?.ok_or_else(|| Error::not_found("HEAD"));
        }
        Hash::from_hex(&rev.to_ascii_lowercase())
    }

    /// Commit the staged entries with the current time.
    pub fn commit(&self, message: &str) -> Result<Hash> {
        self.commit_at(message, Utc::now())
    }

    /// Commit the staged entries with an explicit timestamp.
    ///
    /// An empty index is allowed and produces a commit with no files. If this
    /// fails after the commit object is written but before head moves, the
    /// object is orphaned and head still names the previous commit.
    pub fn commit_at(&self, message: &str, timestamp: DateTime<Utc>) -> Result<Hash> {
        let mut index = self.index()?;
        let parent = self.head()?;

        let commit = Commit::new(message, parent, timestamp, index.snapshot().to_vec());
        let hash = self.store.put_commit(&commit)?;

        self.head.write(&hash)?;
        index.clear()?;

        info!(
            commit = %hash,
            parent = ?parent.map(|p| p.to_hex()),
            files = commit.files.len(),
            "created commit"
        );
        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_layout() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path(), Algorithm::Sha1).unwrap();

        let dir = temp_dir.path().join(REPO_DIR);
        assert!(dir.join("object").is_dir());
        assert!(dir.join("head").is_file());
        assert!(dir.join("index").is_file());
        assert_eq!(
            fs::read_to_string(dir.join("config")).unwrap(),
            "version=1\nalgo=sha1\n"
        );
        assert_eq!(repo.head().unwrap(), None);
        assert!(repo.status().unwrap().is_empty());
    }

    #[test]
    fn test_init_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path(), Algorithm::Blake3).unwrap();

        let blob = repo.store().put(b"hello\n").unwrap();
        repo.index().unwrap().stage("a.txt", blob).unwrap();

        // Second init keeps the algorithm and the staged entry
        let again = Repository::init(temp_dir.path(), Algorithm::Sha1).unwrap();
        assert_eq!(again.algorithm(), Algorithm::Blake3);
        assert_eq!(again.status().unwrap().len(), 1);
    }

    #[test]
    fn test_open_missing() {
        let temp_dir = TempDir::new().unwrap();
        let err = Repository::open(temp_dir.path()).unwrap_err();
        assert!(matches!(err, Error::InvalidRepository { .. }));
    }

    #[test]
    fn test_open_missing_objects_dir() {
        let temp_dir = TempDir::new().unwrap();
        Repository::init(temp_dir.path(), Algorithm::Sha1).unwrap();
        fs::remove_dir_all(temp_dir.path().join(REPO_DIR).join("object")).unwrap();

        assert!(Repository::open(temp_dir.path()).is_err());
    }

    #[test]
    fn test_discover_from_subdirectory() {
        let temp_dir = TempDir::new().unwrap();
        Repository::init(temp_dir.path(), Algorithm::Sha1).unwrap();

        let nested = temp_dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let repo = Repository::discover(&nested).unwrap();
        assert_eq!(repo.workdir(), fs::canonicalize(temp_dir.path()).unwrap());
    }

    #[test]
    fn test_discover_none() {
        let temp_dir = TempDir::new().unwrap();
        assert!(Repository::discover(temp_dir.path()).is_err());
    }

    #[test]
    fn test_commit_clears_index_and_moves_head() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path(), Algorithm::Sha1).unwrap();

        let blob = repo.store().put(b"hello\n").unwrap();
        repo.index().unwrap().stage("a.txt", blob).unwrap();

        let c1 = repo.commit("first").unwrap();
        assert_eq!(repo.head().unwrap(), Some(c1));
        assert!(repo.status().unwrap().is_empty());

        let commit = repo.find_commit(&c1).unwrap();
        assert_eq!(commit.message, "first");
        assert_eq!(commit.parent, None);
        assert_eq!(commit.files, vec![StagingEntry::new("a.txt", blob)]);

        let c2 = repo.commit("second").unwrap();
        let second = repo.find_commit(&c2).unwrap();
        assert_eq!(second.parent, Some(c1));
        assert!(second.files.is_empty());
    }

    #[test]
    fn test_empty_commit_allowed() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path(), Algorithm::Sha1).unwrap();

        let hash = repo.commit("nothing staged").unwrap();
        let commit = repo.find_commit(&hash).unwrap();
        assert!(commit.files.is_empty());
        assert!(commit.is_root());
    }

    #[test]
    fn test_commit_digest_covers_serialized_form() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path(), Algorithm::Sha1).unwrap();

        let hash = repo.commit("msg").unwrap();
        let commit = repo.find_commit(&hash).unwrap();
        assert_eq!(hash, Algorithm::Sha1.digest(&commit.to_bytes().unwrap()));
    }

    #[test]
    fn test_commit_objects_are_immutable() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path(), Algorithm::Sha1).unwrap();

        let c1 = repo.commit("first").unwrap();
        let path = repo.store().object_path(&c1);
        let before = fs::read(&path).unwrap();
        let record = repo.find_commit(&c1).unwrap();

        repo.commit("second").unwrap();
        repo.commit("third").unwrap();

        assert_eq!(fs::read(&path).unwrap(), before);
        assert_eq!(repo.find_commit(&c1).unwrap(), record);
    }

    #[test]
    fn test_resolve() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path(), Algorithm::Sha1).unwrap();

        assert!(matches!(
            repo.resolve("HEAD").unwrap_err(),
            Error::NotFound { .. }
        ));

        let c1 = repo.commit("first").unwrap();
        assert_eq!(repo.resolve("HEAD").unwrap(), c1);
        assert_eq!(repo.resolve(&c1.to_hex().to_uppercase()).unwrap(), c1);
        assert!(matches!(
            repo.resolve("abc").unwrap_err(),
            Error::InvalidHash { .. }
        ));
    }

    #[test]
    fn test_corrupt_index_surfaces() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path(), Algorithm::Sha1).unwrap();
        fs::write(temp_dir.path().join(REPO_DIR).join("index"), "{").unwrap();

        assert!(matches!(
            repo.commit("x").unwrap_err(),
            Error::InvalidIndex { .. }
        ));
        // Head untouched
        assert_eq!(repo.head().unwrap(), None);
    }
}
