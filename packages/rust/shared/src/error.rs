//! Error types for docenrich.
//!
//! Library crates use [`EnrichError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all enrichment operations.
#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    /// The targeted remote resource does not exist (404-equivalent).
    ///
    /// Steps that define a fallback patch recover from this; nothing else does.
    #[error("not found: {url}")]
    NotFound { url: String },

    /// Any other transport, status, or decode failure while fetching.
    #[error("fetch error at {url}: {message}")]
    Fetch { url: String, message: String },

    /// A component handler or custom transform failed.
    #[error("handler error: {message}")]
    Handler { message: String },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Malformed input (unparsable prefix, runaway nesting, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, EnrichError>;

impl EnrichError {
    /// Create a not-found error for the given address.
    pub fn not_found(url: impl Into<String>) -> Self {
        Self::NotFound { url: url.into() }
    }

    /// Create a fetch error for the given address.
    pub fn fetch(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            message: msg.into(),
        }
    }

    /// Create a handler error from any displayable message.
    pub fn handler(msg: impl Into<String>) -> Self {
        Self::Handler {
            message: msg.into(),
        }
    }

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

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this failure means "the resource does not exist".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
