//! Adding working-tree files to the store and the staging index.

use crate::error::{Error, Result};
use crate::index::StagingEntry;
use crate::repo::{REPO_DIR, Repository};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

impl Repository {
    /// Add a file or directory.
    ///
    /// A file is stored as a blob and staged. A directory is walked recursively
    /// (honouring `.gitignore`, skipping `.flux`) and every file is staged in
    /// sorted path order. Relative paths are taken relative to the working
    /// directory. Returns the staged entries.
    pub fn add<P: AsRef<Path>>(&self, path: P) -> Result<Vec<StagingEntry>> {
        let path = path.as_ref();
        let full = self.workdir().join(path);

        if !full.exists() {
            return Err(Error::Io {
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("Path does not exist: {}", path.display()),
                ),
            });
        }

        let full = fs::canonicalize(&full)?;
        let metadata = fs::metadata(&full)?;

        let files = if metadata.is_file() {
            vec![full]
        } else if metadata.is_dir() {
            self.collect_files(&full)?
        } else {
            return Err(Error::Io {
                source: std::io::Error::other(format!(
                    "Unsupported file type: {}",
                    path.display()
                )),
            });
        };

        let mut entries = Vec::with_capacity(files.len());
        for file in &files {
            let content = fs::read(file)?;
            let hash = self.store().put(&content)?;
            entries.push(StagingEntry::new(self.staged_path(file), hash));
        }

        self.index()?.stage_all(entries.clone())?;
        debug!(path = %path.display(), files = entries.len(), "added");

        Ok(entries)
    }

    /// Files under `dir`, sorted, excluding the repository directory.
    fn collect_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let walker = ignore::WalkBuilder::new(dir)
            .hidden(false) // Include hidden files
            .git_ignore(true) // Respect .gitignore
            .require_git(false)
            .filter_entry(|entry| entry.file_name() != REPO_DIR)
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry?;
            if entry.file_type().is_some_and(|t| t.is_file()) {
                files.push(entry.into_path());
            }
        }

        files.sort();
        Ok(files)
    }

    /// Index path for an absolute file path: relative to the working directory
    /// with `/` separators, or the path as-is when outside it.
    pub(crate) fn staged_path(&self, abs: &Path) -> String {
        match abs.strip_prefix(self.workdir()) {
            Ok(relative) => relative
                .components()
                .filter_map(|c| match c {
                    Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("/"),
            Err(_) => abs.display().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Algorithm;
    use tempfile::TempDir;

    fn init_repo(temp_dir: &TempDir) -> Repository {
        Repository::init(temp_dir.path(), Algorithm::Sha1).unwrap()
    }

    #[test]
    fn test_add_file_stages_entry() {
        let temp_dir = TempDir::new().unwrap();
        let repo = init_repo(&temp_dir);
        fs::write(temp_dir.path().join("a.txt"), "hello\n").unwrap();

        let entries = repo.add("a.txt").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "a.txt");
        assert_eq!(
            entries[0].hash.to_hex(),
            "f572d396fae9206628714fb2ce00f72e94f2258f"
        );
        assert_eq!(repo.status().unwrap(), entries);
        assert_eq!(repo.cat(&entries[0].hash).unwrap(), b"hello\n");
    }

    #[test]
    fn test_add_absolute_path_inside_workdir() {
        let temp_dir = TempDir::new().unwrap();
        let repo = init_repo(&temp_dir);
        let nested = temp_dir.path().join("src");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("main.rs"), "fn main() {}\n").unwrap();

        let entries = repo.add(nested.join("main.rs")).unwrap();
        assert_eq!(entries[0].path, "src/main.rs");
    }

    #[test]
    fn test_add_same_path_twice_keeps_both() {
        let temp_dir = TempDir::new().unwrap();
        let repo = init_repo(&temp_dir);
        let file = temp_dir.path().join("a.txt");

        fs::write(&file, "v1\n").unwrap();
        repo.add("a.txt").unwrap();
        fs::write(&file, "v2\n").unwrap();
        repo.add("a.txt").unwrap();

        let index = repo.index().unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(
            index.lookup("a.txt").unwrap().hash,
            Algorithm::Sha1.digest(b"v2\n")
        );
    }

    #[test]
    fn test_add_identical_content_dedupes() {
        let temp_dir = TempDir::new().unwrap();
        let repo = init_repo(&temp_dir);
        fs::write(temp_dir.path().join("a.txt"), "same\n").unwrap();
        fs::write(temp_dir.path().join("b.txt"), "same\n").unwrap();

        repo.add("a.txt").unwrap();
        repo.add("b.txt").unwrap();
        repo.commit("first").unwrap();
        repo.add("a.txt").unwrap();
        repo.commit("second").unwrap();

        // one blob + two commits
        assert_eq!(repo.store().object_count().unwrap(), 3);
    }

    #[test]
    fn test_add_directory() {
        let temp_dir = TempDir::new().unwrap();
        let repo = init_repo(&temp_dir);
        let root = temp_dir.path();

        fs::create_dir_all(root.join("dir/sub")).unwrap();
        fs::write(root.join("dir/b.txt"), "b\n").unwrap();
        fs::write(root.join("dir/a.txt"), "a\n").unwrap();
        fs::write(root.join("dir/sub/c.txt"), "c\n").unwrap();

        let entries = repo.add("dir").unwrap();
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["dir/a.txt", "dir/b.txt", "dir/sub/c.txt"]);
    }

    #[test]
    fn test_add_workdir_skips_repo_dir_and_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let repo = init_repo(&temp_dir);
        let root = temp_dir.path();

        fs::write(root.join(".gitignore"), "*.log\n").unwrap();
        fs::write(root.join("keep.txt"), "keep\n").unwrap();
        fs::write(root.join("debug.log"), "noise\n").unwrap();

        let entries = repo.add(".").unwrap();
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec![".gitignore", "keep.txt"]);
    }

    #[test]
    fn test_add_missing_path() {
        let temp_dir = TempDir::new().unwrap();
        let repo = init_repo(&temp_dir);

        let err = repo.add("nope.txt").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert!(repo.status().unwrap().is_empty());
    }

    #[test]
    fn test_add_binary_file_roundtrips() {
        let temp_dir = TempDir::new().unwrap();
        let repo = init_repo(&temp_dir);
        let data = vec![0u8, 159, 146, 150, 255];
        fs::write(temp_dir.path().join("bin.dat"), &data).unwrap();

        let entries = repo.add("bin.dat").unwrap();
        assert_eq!(repo.cat(&entries[0].hash).unwrap(), data);
    }
}
