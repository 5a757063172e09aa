//! Error types for the caninana engine.
//!
//! All failure scenarios are represented by the [`EngineError`] sum type.
//! The library never panics on bad input; every fallible operation returns
//! a `Result` value.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// The error type for all engine operations.
///
/// Each variant carries enough context to identify what failed and why,
/// without holding on to live OS resources.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A file or its metadata could not be accessed.
    #[error("file access failed for '{path}': {reason}")]
    FileAccess {
        /// Path that could not be accessed.
        path: PathBuf,
        /// Human-readable reason for the failure.
        reason: String,
    },

    /// The signature database is not valid JSON or is missing required
    /// structure.
    #[error("signature database is malformed: {reason}")]
    DatabaseParse {
        /// Description of what is wrong with the database.
        reason: String,
    },

    /// The quarantine directory or ledger could not be created.
    #[error("quarantine initialization failed: {reason}")]
    Initialization {
        /// Description of the initialization failure.
        reason: String,
    },

    /// A quarantine or restore operation failed after its pre-checks.
    ///
    /// Compensating actions (reverse moves, re-obfuscation) have already
    /// been attempted by the time this error is returned.
    #[error("quarantine operation failed: {reason}")]
    Quarantine {
        /// Description of the failure.
        reason: String,
    },

    /// A signature update failed: network error, non-success HTTP status,
    /// or post-download validation failure.
    #[error("signature update failed: {reason}")]
    Update {
        /// Description of the failure.
        reason: String,
    },
}

impl EngineError {
    /// Creates a `FileAccess` error from a path and an underlying cause.
    pub fn file_access(path: impl AsRef<Path>, reason: impl ToString) -> Self {
        Self::FileAccess {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Creates a `DatabaseParse` error.
    pub fn database_parse(reason: impl Into<String>) -> Self {
        Self::DatabaseParse {
            reason: reason.into(),
        }
    }

    /// Creates an `Initialization` error.
    pub fn initialization(reason: impl Into<String>) -> Self {
        Self::Initialization {
            reason: reason.into(),
        }
    }

    /// Creates a `Quarantine` error.
    pub fn quarantine(reason: impl Into<String>) -> Self {
        Self::Quarantine {
            reason: reason.into(),
        }
    }

    /// Creates an `Update` error.
    pub fn update(reason: impl Into<String>) -> Self {
        Self::Update {
            reason: reason.into(),
        }
    }
}

/// A specialized `Result` type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
