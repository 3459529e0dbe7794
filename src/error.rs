use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for docfill operations
#[derive(Error, Debug)]
pub enum DocfillError {
    /// Directive marker whose path expression is empty or contains invalid characters
    #[error("Malformed directive at position {position}: {directive} ({reason})")]
    MalformedDirective {
        position: usize,
        directive: String,
        reason: String,
    },

    /// Block opened without a matching close, or closed with the wrong kind
    #[error("Unmatched directive at position {position}: {message}")]
    UnmatchedDirective { position: usize, message: String },

    /// IO error when reading templates or context files
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// File not found error with specific path
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Context data that is valid JSON but not usable as a root context
    #[error("Invalid context: {message}")]
    InvalidContext { message: String },

    /// JSON parse or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DocfillError {
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedDirective { .. })
    }

    pub fn is_unmatched(&self) -> bool {
        matches!(self, Self::UnmatchedDirective { .. })
    }
}

pub type Result<T> = std::result::Result<T, DocfillError>;
