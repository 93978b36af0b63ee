//! Error taxonomy for the signal index.
//!
//! Every fallible operation in the workspace returns [`Result`]. Failures are
//! fatal to the operation in progress; nothing here is retried.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the sigidx crates.
pub type Result<T> = std::result::Result<T, SigIdxError>;

/// Every failure the signal index can report.
#[derive(Debug, Error)]
pub enum SigIdxError {
    /// The external store could not be opened.
    #[error("failed to open signal store {}: {detail}", path.display())]
    Initialization { path: PathBuf, detail: String },

    /// Identifier absent from the index.
    #[error("read id not found in index: {read_id}")]
    NotFound { read_id: String },

    /// Persisted index stream is malformed (tag, version, truncation).
    #[error("index format error: {detail}")]
    Format { detail: String },

    /// The external store reported a failure during build or fetch.
    #[error("signal store error: {detail}")]
    Store { detail: String },

    /// Caller-supplied identifier has the wrong length or is not well-formed.
    #[error("invalid read id: {detail}")]
    InvalidKey { detail: String },

    /// Configuration could not be read or failed validation.
    #[error("configuration error: {detail}")]
    Config { detail: String },

    /// OS-level I/O failure outside the index format itself.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invariant violation inside this workspace.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SigIdxError {
    pub fn store(detail: impl Into<String>) -> Self {
        Self::Store {
            detail: detail.into(),
        }
    }

    pub fn format(detail: impl Into<String>) -> Self {
        Self::Format {
            detail: detail.into(),
        }
    }

    pub fn invalid_key(detail: impl Into<String>) -> Self {
        Self::InvalidKey {
            detail: detail.into(),
        }
    }

    pub fn config(detail: impl Into<String>) -> Self {
        Self::Config {
            detail: detail.into(),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal(detail.into())
    }

    pub fn not_found(read_id: impl ToString) -> Self {
        Self::NotFound {
            read_id: read_id.to_string(),
        }
    }

    pub fn initialization(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Self::Initialization {
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// Whether this error means "identifier absent from the index".
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether this error means the persisted stream was rejected.
    #[must_use]
    pub const fn is_format(&self) -> bool {
        matches!(self, Self::Format { .. })
    }

    /// Map an I/O error raised while reading an index stream.
    ///
    /// Premature end of stream is a format error (truncated file); anything
    /// else stays an I/O error.
    #[must_use]
    pub fn from_index_read(err: io::Error, what: &str) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::format(format!("truncated index stream while reading {what}"))
        } else {
            Self::Io(err)
        }
    }
}
