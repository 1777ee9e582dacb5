//! # Flux Core
//!
//! A minimal content-addressed version control engine.
//!
//! File contents are stored as immutable blobs keyed by their digest. Staged
//! `(path, digest)` pairs are collected in an index and turned into commits that
//! form a single linear chain, which can be walked newest-first and diffed
//! line by line against each commit's parent.
//!
//! ## Features
//!
//! - Content-addressed storage with automatic deduplication
//! - Persistent staging index, duplicates preserved (last entry wins on lookup)
//! - Linear commit chain with a single head pointer
//! - Lazy, cycle-guarded history traversal
//! - LCS-based line diffs
//!
//! ## Example
//!
//! ```no_run
//! use flux_core::{Algorithm, CommitDiff, Repository};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let repo = Repository::init("./project", Algorithm::Sha1)?;
//!
//! repo.add("notes.txt")?;
//! let first = repo.commit("first")?;
//!
//! for entry in repo.log()? {
//!     let (hash, commit) = entry?;
//!     println!("{} {} {}", hash.short(), commit.timestamp, commit.message);
//! }
//!
//! if let CommitDiff::FirstCommit { .. } = repo.show(&first)? {
//!     println!("first commit, nothing to diff");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! There is no cross-process locking. Two processes adding or committing at the
//! same time can lose a staged entry, because the index is read, modified and
//! rewritten without coordination. Individual file writes are atomic.

mod commit;
mod config;
mod diff;
mod error;
mod hash;
mod head;
mod history;
mod index;
mod object;
mod repo;
mod store;
mod walk;

pub use commit::Commit;
pub use config::RepoConfig;
pub use diff::{
    CommitDiff, FileChange, FileDiff, Segment, SegmentKind, diff_lines, reconstruct_new,
    reconstruct_old, split_lines,
};
pub use error::{Error, ErrorKind, Result};
pub use hash::{Algorithm, HASH_SIZE, Hash};
pub use head::HeadRef;
pub use history::History;
pub use index::{StagingEntry, StagingIndex};
pub use object::{Encoding, ObjectEnvelope, ObjectType};
pub use repo::{REPO_DIR, Repository};
pub use store::ContentStore;
