//! Error types for the Falx library.
//!
//! Every failure in Falx is represented by the [`FalxError`] enum. The
//! gateway sorts failures into two delivery paths: admission errors
//! ([`FalxError::Busy`], [`FalxError::InvalidArgument`]) are returned
//! synchronously from the submitting call and never reach a continuation,
//! while everything raised inside a worker body is normalized into one of
//! the remaining variants and delivered through the continuation's error
//! slot.
//!
//! # Examples
//!
//! ```
//! use falx::error::{FalxError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(FalxError::invalid_argument("empty draft"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("success"),
//!     Err(e) => eprintln!("error: {e}"),
//! }
//! ```

use std::io;

use thiserror::Error;

use crate::extract::ExtractStatus;

/// The main error type for Falx operations.
#[derive(Error, Debug)]
pub enum FalxError {
    /// The target handle already has an outstanding task.
    #[error("busy: {0}")]
    Busy(String),

    /// Malformed or missing arguments, detected before any task is scheduled.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A failure raised by the search engine inside a worker body,
    /// carrying the engine's diagnostic message.
    #[error("engine error: {0}")]
    Engine(String),

    /// The file-extraction collaborator reported a non-OK status or failed
    /// outright during document assembly.
    #[error("extraction error ({status:?}): {message}")]
    Extraction {
        /// The collaborator's status code.
        status: ExtractStatus,
        /// Human-readable detail.
        message: String,
    },

    /// I/O errors (index directories, extracted files, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic anyhow error
    #[error("error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with [`FalxError`].
pub type Result<T> = std::result::Result<T, FalxError>;

impl FalxError {
    /// Create a new busy (admission) error.
    pub fn busy<S: Into<String>>(msg: S) -> Self {
        FalxError::Busy(msg.into())
    }

    /// Create a new invalid-argument (admission) error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        FalxError::InvalidArgument(msg.into())
    }

    /// Create a new engine error.
    pub fn engine<S: Into<String>>(msg: S) -> Self {
        FalxError::Engine(msg.into())
    }

    /// Create a new extraction error.
    pub fn extraction<S: Into<String>>(status: ExtractStatus, msg: S) -> Self {
        FalxError::Extraction {
            status,
            message: msg.into(),
        }
    }

    /// True for errors reported synchronously at submission time.
    pub fn is_admission(&self) -> bool {
        matches!(self, FalxError::Busy(_) | FalxError::InvalidArgument(_))
    }
}
