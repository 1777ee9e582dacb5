//! Output formatting for CLI commands.
//!
//! Provides abstraction layer for outputting results in text or JSON format.

use anyhow::Result;
use chrono::{DateTime, Utc};
use flux_core::{
    Commit, Encoding, ErrorKind, FileChange, FileDiff, Hash, Segment, SegmentKind, StagingEntry,
    split_lines,
};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::fmt::Write as _;
use std::io::{self, Write};

/// Process exit codes.
pub mod codes {
    use super::ErrorKind;

    pub const SUCCESS: u8 = 0;
    pub const FAILURE: u8 = 1;
    pub const NOT_FOUND: u8 = 3;
    pub const CORRUPT: u8 = 4;
    pub const INVALID_STATE: u8 = 5;
    pub const INVALID_HASH: u8 = 6;

    /// Exit code for a library error kind.
    pub fn for_kind(kind: ErrorKind) -> u8 {
        match kind {
            ErrorKind::NotFound => NOT_FOUND,
            ErrorKind::Corrupt => CORRUPT,
            ErrorKind::InvalidState => INVALID_STATE,
            ErrorKind::InvalidHash => INVALID_HASH,
            ErrorKind::Io => FAILURE,
        }
    }

    /// Exit code for an error chain, using the first library error found.
    pub fn for_error(error: &anyhow::Error) -> u8 {
        error
            .chain()
            .find_map(|e| e.downcast_ref::<flux_core::Error>())
            .map(|e| for_kind(e.kind()))
            .unwrap_or(FAILURE)
    }
}

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Writer for command output with format abstraction.
pub struct OutputWriter {
    format: OutputFormat,
    color: bool,
    stdout: io::Stdout,
}

impl OutputWriter {
    /// Create a new OutputWriter.
    pub fn new(json: bool, color: bool) -> Self {
        Self {
            format: if json {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            },
            color: color && !json,
            stdout: io::stdout(),
        }
    }

    /// Check if JSON mode is enabled.
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Write output using the configured format.
    ///
    /// The `data` parameter must be a serializable struct that includes
    /// `success: bool` and `result_code: u8` fields.
    ///
    /// The `text_fn` closure is called only in text mode to generate the
    /// human-readable output.
    pub fn write<T: Serialize>(&self, data: &T, text_fn: impl FnOnce() -> String) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(data)?;
                writeln!(&self.stdout, "{}", json)?;
            }
            OutputFormat::Text => {
                let text = text_fn();
                if !text.is_empty() {
                    write!(&self.stdout, "{}", text)?;
                }
            }
        }
        Ok(())
    }

    /// Write raw bytes to stdout (text mode only).
    pub fn write_raw(&self, bytes: &[u8]) -> Result<()> {
        let mut handle = self.stdout.lock();
        handle.write_all(bytes)?;
        handle.flush()?;
        Ok(())
    }

    /// Write an error message to stderr.
    ///
    /// In JSON mode, writes a JSON error object with success=false.
    /// In text mode, writes the error message with its context chain.
    pub fn write_error(&self, error: &anyhow::Error, result_code: u8) {
        match self.format {
            OutputFormat::Json => {
                let error_output = ErrorOutput {
                    success: false,
                    result_code,
                    error: format!("{:#}", error),
                };
                if let Ok(json) = serde_json::to_string_pretty(&error_output) {
                    let _ = writeln!(io::stderr(), "{}", json);
                }
            }
            OutputFormat::Text => {
                let _ = writeln!(io::stderr(), "Error: {:#}", error);
            }
        }
    }

    /// Report a non-fatal problem on stderr in text mode.
    ///
    /// JSON payloads carry these in their own `error` fields instead.
    pub fn warn(&self, message: impl std::fmt::Display) {
        if self.format == OutputFormat::Text {
            let _ = writeln!(io::stderr(), "Error: {}", message);
        }
    }

    /// Render diff segments as `+`/`-`/` ` prefixed lines.
    pub fn render_segments(&self, segments: &[Segment]) -> String {
        let mut text = String::new();
        for segment in segments {
            for line in split_lines(&segment.text) {
                let body = line.strip_suffix('\n').unwrap_or(line);
                let rendered = match segment.kind {
                    SegmentKind::Equal => format!(" {}", body),
                    SegmentKind::Insert => format!("+{}", body),
                    SegmentKind::Delete => format!("-{}", body),
                };
                if !self.color {
                    text.push_str(&rendered);
                } else {
                    let _ = match segment.kind {
                        SegmentKind::Equal => write!(text, "{}", rendered.dimmed()),
                        SegmentKind::Insert => write!(text, "{}", rendered.green()),
                        SegmentKind::Delete => write!(text, "{}", rendered.red()),
                    };
                }
                text.push('\n');
                if !line.ends_with('\n') {
                    text.push_str("\\ No newline at end of file\n");
                }
            }
        }
        text
    }

    /// Render a file header and its diff.
    pub fn render_file_diff(&self, file: &FileDiff) -> String {
        let (status, body) = match &file.change {
            FileChange::Added { segments } => ("new file", self.render_segments(segments)),
            FileChange::Modified { segments, .. } if file.change.is_unchanged() => {
                ("unchanged", self.render_segments(segments))
            }
            FileChange::Modified { segments, .. } => ("modified", self.render_segments(segments)),
            FileChange::Failed { error } => ("failed", format!("  {}\n", error)),
        };

        let header = format!("--- {} ({})", file.path, status);
        if self.color {
            format!("{}\n{}", header.bold(), body)
        } else {
            format!("{}\n{}", header, body)
        }
    }

    /// Color a commit hash for headers.
    pub fn hash(&self, hash: &Hash) -> String {
        if self.color {
            hash.to_hex().yellow().to_string()
        } else {
            hash.to_hex()
        }
    }
}

// ============================================================================
// Data Transfer Objects (DTOs) for JSON output
// ============================================================================

/// Error output structure.
#[derive(Debug, Serialize)]
pub struct ErrorOutput {
    pub success: bool,
    pub result_code: u8,
    pub error: String,
}

/// Output for `init` command.
#[derive(Debug, Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub result_code: u8,
    pub root: String,
    pub algorithm: String,
    pub reinitialized: bool,
}

/// Output for `add` command.
#[derive(Debug, Serialize)]
pub struct AddOutput {
    pub success: bool,
    pub result_code: u8,
    pub entries: Vec<StagingEntry>,
}

/// Output for `commit` command.
#[derive(Debug, Serialize)]
pub struct CommitOutput {
    pub success: bool,
    pub result_code: u8,
    pub hash: Hash,
    pub parent: Option<Hash>,
    pub message: String,
    pub files: usize,
}

/// Commit information for `log`.
#[derive(Debug, Clone, Serialize)]
pub struct CommitInfo {
    pub hash: Hash,
    pub parent: Option<Hash>,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub files: usize,
}

impl CommitInfo {
    pub fn new(hash: Hash, commit: &Commit) -> Self {
        Self {
            hash,
            parent: commit.parent,
            timestamp: commit.timestamp,
            message: commit.message.clone(),
            files: commit.files.len(),
        }
    }
}

/// Output for `log` command.
#[derive(Debug, Serialize)]
pub struct LogOutput {
    pub success: bool,
    pub result_code: u8,
    pub commits: Vec<CommitInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-file diff information for `show` and `diff`.
#[derive(Debug, Serialize)]
pub struct FileDiffInfo {
    pub path: String,
    pub hash: Hash,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old: Option<Hash>,
    pub segments: Vec<Segment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&FileDiff> for FileDiffInfo {
    fn from(file: &FileDiff) -> Self {
        let (status, old, segments, error) = match &file.change {
            FileChange::Added { segments } => ("added", None, segments.clone(), None),
            FileChange::Modified { old, segments } => {
                ("modified", Some(*old), segments.clone(), None)
            }
            FileChange::Failed { error } => ("failed", None, Vec::new(), Some(error.to_string())),
        };
        Self {
            path: file.path.clone(),
            hash: file.hash,
            status,
            old,
            segments,
            error,
        }
    }
}

/// Output for `show` command.
#[derive(Debug, Serialize)]
pub struct ShowOutput {
    pub success: bool,
    pub result_code: u8,
    pub commit: Hash,
    pub parent: Option<Hash>,
    pub first_commit: bool,
    pub files: Vec<FileDiffInfo>,
}

/// Output for `diff` command.
#[derive(Debug, Serialize)]
pub struct DiffOutput {
    pub success: bool,
    pub result_code: u8,
    #[serde(flatten)]
    pub file: FileDiffInfo,
}

/// Output for `status` command.
#[derive(Debug, Serialize)]
pub struct StatusOutput {
    pub success: bool,
    pub result_code: u8,
    pub head: Option<Hash>,
    pub staged: Vec<StagingEntry>,
}

/// Output for `cat` command.
#[derive(Debug, Serialize)]
pub struct CatOutput {
    pub success: bool,
    pub result_code: u8,
    pub hash: Hash,
    pub size: usize,
    pub encoding: Encoding,
    pub content: String,
}
