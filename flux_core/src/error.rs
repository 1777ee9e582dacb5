//! Error types for flux_core.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using flux_core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during repository operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred during file operations.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// A record could not be serialized.
    #[error("Serialization error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// Object not found in store.
    #[error("Object not found: {hash}")]
    NotFound { hash: String },

    /// A commit in the history chain could not be resolved.
    #[error("Corrupt history at {hash}: {reason}")]
    CorruptHistory { hash: String, reason: String },

    /// Object file is corrupted or invalid.
    #[error("Corrupted object at {path}: {reason}")]
    CorruptedObject { path: PathBuf, reason: String },

    /// The staging index could not be decoded.
    #[error("Invalid index at {path}: {reason}")]
    InvalidIndex { path: PathBuf, reason: String },

    /// The head pointer could not be decoded.
    #[error("Invalid head at {path}: {reason}")]
    InvalidHead { path: PathBuf, reason: String },

    /// Repository is missing or not initialized.
    #[error("Invalid repository at {path}: {reason}")]
    InvalidRepository { path: PathBuf, reason: String },

    /// Repository config file is malformed.
    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },

    /// Invalid hash format or encoding.
    #[error("Invalid hash: {reason}")]
    InvalidHash { reason: String },

    /// Object exists but has an unexpected type.
    #[error("Invalid object type: expected {expected}, got {got}")]
    InvalidObjectType { expected: String, got: String },

    /// Unsupported algorithm.
    #[error("Unsupported algorithm: {algorithm}")]
    UnsupportedAlgorithm { algorithm: String },
}

/// Coarse classification of errors, used by callers to pick exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Requested object does not exist (or is not of the requested type).
    NotFound,
    /// History chain or stored object is damaged.
    Corrupt,
    /// Persisted repository state (index, head, config, layout) is unreadable.
    InvalidState,
    /// User supplied a malformed digest.
    InvalidHash,
    /// Filesystem or other I/O failure.
    Io,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } | Error::InvalidObjectType { .. } => ErrorKind::NotFound,
            Error::CorruptHistory { .. } | Error::CorruptedObject { .. } => ErrorKind::Corrupt,
            Error::InvalidIndex { .. }
            | Error::InvalidHead { .. }
            | Error::InvalidRepository { .. }
            | Error::InvalidConfig { .. }
            | Error::UnsupportedAlgorithm { .. } => ErrorKind::InvalidState,
            Error::InvalidHash { .. } => ErrorKind::InvalidHash,
            Error::Io { .. } | Error::Json { .. } => ErrorKind::Io,
        }
    }

    /// Create a NotFound error.
    pub fn not_found(hash: impl Into<String>) -> Self {
        Error::NotFound { hash: hash.into() }
    }

    /// Create a CorruptHistory error.
    pub fn corrupt_history(hash: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::CorruptHistory {
            hash: hash.into(),
            reason: reason.into(),
        }
    }

    /// Create a CorruptedObject error.
    pub fn corrupted_object(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::CorruptedObject {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidIndex error.
    pub fn invalid_index(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::InvalidIndex {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidHead error.
    pub fn invalid_head(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::InvalidHead {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidRepository error.
    pub fn invalid_repository(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::InvalidRepository {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Error::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create an InvalidHash error.
    pub fn invalid_hash(reason: impl Into<String>) -> Self {
        Error::InvalidHash {
            reason: reason.into(),
        }
    }

    /// Create an InvalidObjectType error.
    pub fn invalid_object_type(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Error::InvalidObjectType {
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Create an UnsupportedAlgorithm error.
    pub fn unsupported_algorithm(algorithm: impl Into<String>) -> Self {
        Error::UnsupportedAlgorithm {
            algorithm: algorithm.into(),
        }
    }
}

// Additional From implementations for external error types

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::Io { source: err.error }
    }
}

impl From<ignore::Error> for Error {
    fn from(err: ignore::Error) -> Self {
        // ignore::Error can wrap an io::Error or be a path error
        match err.io_error() {
            Some(io_err) => Error::Io {
                source: std::io::Error::new(io_err.kind(), io_err.to_string()),
            },
            None => Error::Io {
                source: std::io::Error::other(err.to_string()),
            },
        }
    }
}
