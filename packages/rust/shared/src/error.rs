//! Error types for the VRAC pipeline.
//!
//! Library crates use [`VracError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all VRAC pipeline operations.
///
/// Only a handful of variants are fatal to a run (input root, output write,
/// enrichment invariants). Per-row and per-file problems are absorbed by the
/// parsers and the runner and never surface as a `VracError`.
#[derive(Debug, thiserror::Error)]
pub enum VracError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The input root is missing or is not a readable directory.
    #[error("input root {path:?} is not readable: {reason}")]
    InputRoot { path: PathBuf, reason: String },

    /// An enrichment stage failed or the stage registry is inconsistent.
    #[error("enrichment error: {0}")]
    Enrichment(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (invariant breach, schema mismatch, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// JSON/TOML/CSV serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, VracError>;

impl VracError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create an enrichment error from any displayable message.
    pub fn enrichment(msg: impl Into<String>) -> Self {
        Self::Enrichment(msg.into())
    }

    /// Create an input-root error for `path`.
    pub fn input_root(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InputRoot {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = VracError::config("unknown dialect");
        assert_eq!(err.to_string(), "config error: unknown dialect");

        let err = VracError::validation("row sum 10 != totalQuantity 12");
        assert!(err.to_string().contains("row sum 10"));

        let err = VracError::input_root("/nope", "not found");
        assert!(err.to_string().contains("/nope"));
        assert!(err.to_string().contains("not found"));
    }
}
