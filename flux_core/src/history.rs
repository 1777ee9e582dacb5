//! Lazy newest-first traversal of the commit chain.

use crate::commit::Commit;
use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::repo::Repository;
use crate::store::ContentStore;
use std::collections::HashSet;
use std::iter::FusedIterator;
use tracing::warn;

/// Iterator over commits from a starting digest back to the root.
///
/// Yields `Ok((hash, commit))` per commit. If a digest in the chain cannot be
/// resolved, or a digest repeats, a single `CorruptHistory` error is yielded and
/// the walk ends. Records yielded before the error remain valid.
pub struct History<'a> {
    store: &'a ContentStore,
    next: Option<Hash>,
    seen: HashSet<Hash>,
    done: bool,
}

impl<'a> History<'a> {
    /// Walk from `start` (usually head). `None` yields nothing.
    pub fn new(store: &'a ContentStore, start: Option<Hash>) -> Self {
        Self {
            store,
            next: start,
            seen: HashSet::new(),
            done: false,
        }
    }
}

impl Iterator for History<'_> {
    type Item = Result<(Hash, Commit)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let Some(hash) = self.next.take() else {
            self.done = true;
            return None;
        };

        if !self.seen.insert(hash) {
            self.done = true;
            warn!(commit = %hash, "cycle in commit history");
            return Some(Err(Error::corrupt_history(
                hash.to_hex(),
                "cycle detected: commit already visited",
            )));
        }

        match self.store.get_commit(&hash) {
            Ok(commit) => {
                self.next = commit.parent;
                Some(Ok((hash, commit)))
            }
            Err(err) => {
                self.done = true;
                warn!(commit = %hash, error = %err, "unreadable commit in history");
                Some(Err(Error::corrupt_history(hash.to_hex(), err.to_string())))
            }
        }
    }
}

impl FusedIterator for History<'_> {}

impl Repository {
    /// Commits reachable from head, newest first.
    ///
    /// Each call starts fresh from the current head.
    pub fn log(&self) -> Result<History<'_>> {
        Ok(History::new(self.store(), self.head()?))
    }
}
