//! Unified error types for the previewctl workspace.
//!
//! Each higher-level crate defines its own domain-specific error enum when
//! its failures need more structure than these common variants.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum PreviewError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// The HTTP request could not be sent or its response could not be read.
    #[error("request to {url} failed: {message}")]
    Http {
        /// Target URL of the request.
        url: String,
        /// Transport-level failure description.
        message: String,
    },

    /// The remote service answered with a non-success status.
    #[error("request rejected with status {status}: {}", .messages.join("; "))]
    Api {
        /// HTTP status code returned by the service.
        status: u16,
        /// Error messages extracted from the response body.
        messages: Vec<String>,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, PreviewError>;
