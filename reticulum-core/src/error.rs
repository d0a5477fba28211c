//! Structured error types for the Reticulum workspace.

use thiserror::Error;

/// Unified error type for all Reticulum operations.
#[derive(Debug, Error)]
pub enum ReticulumError {
    /// I/O error (file not found, permission denied, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error carrying the character range that triggered it.
    #[error("parse error at {start}..{end}: {message}")]
    Parse {
        /// Human-readable description of the fault.
        message: String,
        /// Offset of the first offending character.
        start: usize,
        /// Offset one past the last offending character.
        end: usize,
    },

    /// Invalid input (bad arguments, out-of-range values)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A node or edge operation crossed graph instances.
    #[error("ownership violation: {0}")]
    Ownership(String),

    /// A query named a node that is not part of the indexed structure.
    #[error("unknown node: {0}")]
    UnknownNode(usize),

    /// Taxa lost or duplicated by network reconstruction.
    #[error("taxon set mismatch: missing {missing:?}, duplicated {duplicated:?}")]
    TaxonMismatch {
        /// Taxa present in the original input but absent after reconstruction.
        missing: Vec<String>,
        /// Taxa occurring more than once after reconstruction.
        duplicated: Vec<String>,
    },

    /// Catch-all for other errors
    #[error("{0}")]
    Other(String),
}

impl ReticulumError {
    /// Build a [`ReticulumError::Parse`] from a message and character range.
    pub fn parse(message: impl Into<String>, start: usize, end: usize) -> Self {
        Self::Parse {
            message: message.into(),
            start,
            end,
        }
    }
}

/// Convenience alias used throughout the Reticulum workspace.
pub type Result<T> = std::result::Result<T, ReticulumError>;
