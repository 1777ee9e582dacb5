//! Line-level diffs between blobs and between a commit and its parent.

use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::repo::Repository;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Segment classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Equal,
    Insert,
    Delete,
}

/// A run of consecutive lines with the same classification.
///
/// `text` keeps line terminators, so segments concatenate back into the
/// original texts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub kind: SegmentKind,
    pub text: String,
}

impl Segment {
    pub fn new(kind: SegmentKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Split into lines, keeping each `\n`. A trailing fragment without a newline
/// is its own line.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split_inclusive('\n').collect()
}

/// Compute a line diff turning `old` into `new`.
///
/// The alignment is a longest common subsequence of lines, found with
/// Hirschberg's divide and conquer so memory stays linear in the input size.
/// Within each changed region deletions are emitted before insertions.
pub fn diff_lines(old: &str, new: &str) -> Vec<Segment> {
    let a = split_lines(old);
    let b = split_lines(new);

    // Compare lines by id rather than by content.
    let mut ids = HashMap::new();
    let a_ids = intern(&mut ids, &a);
    let b_ids = intern(&mut ids, &b);

    let mut ops = Vec::with_capacity(a.len() + b.len());
    align(&a_ids, &b_ids, &mut ops);

    let mut builder = SegmentBuilder::default();
    let (mut i, mut j) = (0, 0);
    for op in ops {
        match op {
            Op::Equal => {
                builder.equal(a[i]);
                i += 1;
                j += 1;
            }
            Op::Delete => {
                builder.delete(a[i]);
                i += 1;
            }
            Op::Insert => {
                builder.insert(b[j]);
                j += 1;
            }
        }
    }

    builder.finish()
}

fn intern<'a>(ids: &mut HashMap<&'a str, u32>, lines: &[&'a str]) -> Vec<u32> {
    lines
        .iter()
        .map(|&line| {
            let next = ids.len() as u32;
            *ids.entry(line).or_insert(next)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Equal,
    Delete,
    Insert,
}

/// Append the edit script turning `a` into `b`.
fn align(a: &[u32], b: &[u32], ops: &mut Vec<Op>) {
    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let (a, b) = (&a[prefix..], &b[prefix..]);
    let suffix = a
        .iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count();
    let (a, b) = (&a[..a.len() - suffix], &b[..b.len() - suffix]);

    ops.extend(std::iter::repeat_n(Op::Equal, prefix));

    if a.is_empty() {
        ops.extend(std::iter::repeat_n(Op::Insert, b.len()));
    } else if b.is_empty() {
        ops.extend(std::iter::repeat_n(Op::Delete, a.len()));
    } else if a.len() == 1 {
        match b.iter().position(|&y| y == a[0]) {
            Some(k) => {
                ops.extend(std::iter::repeat_n(Op::Insert, k));
                ops.push(Op::Equal);
                ops.extend(std::iter::repeat_n(Op::Insert, b.len() - k - 1));
            }
            None => {
                ops.push(Op::Delete);
                ops.extend(std::iter::repeat_n(Op::Insert, b.len()));
            }
        }
    } else {
        let mid = a.len() / 2;
        let forward = lcs_forward(&a[..mid], b);
        let backward = lcs_backward(&a[mid..], b);

        // Earliest split with the best total.
        let mut split = 0;
        let mut best = 0;
        for k in 0..=b.len() {
            let total = forward[k] + backward[k];
            if total > best {
                best = total;
                split = k;
            }
        }

        align(&a[..mid], &b[..split], ops);
        align(&a[mid..], &b[split..], ops);
    }

    ops.extend(std::iter::repeat_n(Op::Equal, suffix));
}

/// `row[k]` = LCS length of `a` and `b[..k]`.
fn lcs_forward(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut row = vec![0u32; b.len() + 1];
    for &x in a {
        let mut diag = 0;
        for k in 1..=b.len() {
            let up = row[k];
            row[k] = if x == b[k - 1] {
                diag + 1
            } else {
                up.max(row[k - 1])
            };
            diag = up;
        }
    }
    row
}

/// `row[k]` = LCS length of `a` and `b[k..]`.
fn lcs_backward(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut row = vec![0u32; b.len() + 1];
    for &x in a.iter().rev() {
        let mut diag = 0;
        for k in (0..b.len()).rev() {
            let down = row[k];
            row[k] = if x == b[k] {
                diag + 1
            } else {
                down.max(row[k + 1])
            };
            diag = down;
        }
    }
    row
}

/// Rebuild the old text from Equal and Delete segments.
pub fn reconstruct_old(segments: &[Segment]) -> String {
    segments
        .iter()
        .filter(|s| s.kind != SegmentKind::Insert)
        .map(|s| s.text.as_str())
        .collect()
}

/// Rebuild the new text from Equal and Insert segments.
pub fn reconstruct_new(segments: &[Segment]) -> String {
    segments
        .iter()
        .filter(|s| s.kind != SegmentKind::Delete)
        .map(|s| s.text.as_str())
        .collect()
}

#[derive(Default)]
struct SegmentBuilder {
    segments: Vec<Segment>,
    deleted: String,
    inserted: String,
}

impl SegmentBuilder {
    fn equal(&mut self, line: &str) {
        self.flush_change();
        self.push(SegmentKind::Equal, line);
    }

    fn delete(&mut self, line: &str) {
        self.deleted.push_str(line);
    }

    fn insert(&mut self, line: &str) {
        self.inserted.push_str(line);
    }

    fn flush_change(&mut self) {
        if !self.deleted.is_empty() {
            let text = std::mem::take(&mut self.deleted);
            self.push(SegmentKind::Delete, &text);
        }
        if !self.inserted.is_empty() {
            let text = std::mem::take(&mut self.inserted);
            self.push(SegmentKind::Insert, &text);
        }
    }

    fn push(&mut self, kind: SegmentKind, text: &str) {
        match self.segments.last_mut() {
            Some(last) if last.kind == kind => last.text.push_str(text),
            _ => self.segments.push(Segment::new(kind, text)),
        }
    }

    fn finish(mut self) -> Vec<Segment> {
        self.flush_change();
        self.segments
    }
}

/// Outcome for one file of a commit.
#[derive(Debug)]
pub enum FileChange {
    /// Path absent from the parent: the whole content is inserted.
    Added { segments: Vec<Segment> },
    /// Path present in the parent: diff of parent content against this one.
    Modified { old: Hash, segments: Vec<Segment> },
    /// This file could not be diffed; other files are unaffected.
    Failed { error: Error },
}

impl FileChange {
    /// Diff segments, unless the file failed.
    pub fn segments(&self) -> Option<&[Segment]> {
        match self {
            FileChange::Added { segments } | FileChange::Modified { segments, .. } => {
                Some(segments)
            }
            FileChange::Failed { .. } => None,
        }
    }

    /// True if the segments contain no insertions or deletions.
    pub fn is_unchanged(&self) -> bool {
        matches!(self, FileChange::Modified { segments, .. }
            if segments.iter().all(|s| s.kind == SegmentKind::Equal))
    }
}

/// Diff of one file entry in a commit.
#[derive(Debug)]
pub struct FileDiff {
    pub path: String,
    pub hash: Hash,
    pub change: FileChange,
}

/// Result of `show`.
#[derive(Debug)]
pub enum CommitDiff {
    /// The commit has no parent; there is nothing to diff against.
    FirstCommit { commit: Hash },
    /// Per-file diffs against the immediate parent, in the commit's file order.
    Changes {
        commit: Hash,
        parent: Hash,
        files: Vec<FileDiff>,
    },
}

impl CommitDiff {
    /// Files that failed to diff.
    pub fn failures(&self) -> impl Iterator<Item = &FileDiff> {
        let files: &[FileDiff] = match self {
            CommitDiff::FirstCommit { .. } => &[],
            CommitDiff::Changes { files, .. } => files,
        };
        files
            .iter()
            .filter(|f| matches!(f.change, FileChange::Failed { .. }))
    }
}

fn whole_insert(content: &str) -> Vec<Segment> {
    if content.is_empty() {
        Vec::new()
    } else {
        vec![Segment::new(SegmentKind::Insert, content)]
    }
}

impl Repository {
    /// Read a blob as text (lossy for non-UTF-8 content).
    fn blob_text(&self, hash: &Hash) -> Result<String> {
        let bytes = self.store().get(hash)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Diff every file of `commit` against the same path in its parent.
    ///
    /// Only the immediate parent is consulted. A file that cannot be read is
    /// reported as [`FileChange::Failed`] and the remaining files are still
    /// processed.
    pub fn show(&self, commit_hash: &Hash) -> Result<CommitDiff> {
        let commit = self.find_commit(commit_hash)?;

        let Some(parent_hash) = commit.parent else {
            debug!(commit = %commit_hash, "first commit, nothing to diff");
            return Ok(CommitDiff::FirstCommit {
                commit: *commit_hash,
            });
        };

        let parent = self
            .find_commit(&parent_hash)
            .map_err(|e| Error::corrupt_history(parent_hash.to_hex(), e.to_string()))?;

        let files = commit
            .files
            .iter()
            .map(|entry| {
                let change = self
                    .diff_entry(parent.file(&entry.path).map(|p| p.hash), &entry.hash)
                    .unwrap_or_else(|error| {
                        warn!(path = %entry.path, error = %error, "failed to diff file");
                        FileChange::Failed { error }
                    });
                FileDiff {
                    path: entry.path.clone(),
                    hash: entry.hash,
                    change,
                }
            })
            .collect();

        Ok(CommitDiff::Changes {
            commit: *commit_hash,
            parent: parent_hash,
            files,
        })
    }

    fn diff_entry(&self, old: Option<Hash>, new: &Hash) -> Result<FileChange> {
        let new_text = self.blob_text(new)?;
        match old {
            Some(old) => {
                let old_text = self.blob_text(&old)?;
                Ok(FileChange::Modified {
                    old,
                    segments: diff_lines(&old_text, &new_text),
                })
            }
            None => Ok(FileChange::Added {
                segments: whole_insert(&new_text),
            }),
        }
    }

    /// Diff a working-tree file against its content in the head commit.
    ///
    /// Relative paths are taken relative to the working directory.
    pub fn diff_working<P: AsRef<Path>>(&self, path: P) -> Result<FileDiff> {
        let abs = fs::canonicalize(self.workdir().join(path.as_ref()))?;
        let staged_path = self.staged_path(&abs);
        let bytes = fs::read(&abs)?;
        let hash = self.algorithm().digest(&bytes);
        let new_text = String::from_utf8_lossy(&bytes);

        let old = match self.head()? {
            Some(head) => self.find_commit(&head)?.file(&staged_path).map(|e| e.hash),
            None => None,
        };

        let change = match old {
            Some(old) => FileChange::Modified {
                old,
                segments: diff_lines(&self.blob_text(&old)?, &new_text),
            },
            None => FileChange::Added {
                segments: whole_insert(&new_text),
            },
        };

        Ok(FileDiff {
            path: staged_path,
            hash,
            change,
        })
    }
}
