//! Error types for badge generation.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`BadgeError`].
pub type Result<T> = std::result::Result<T, BadgeError>;

/// Primary error type for catalog loading, rendering and encoding.
#[derive(Debug, Error)]
pub enum BadgeError {
    // === Catalog Errors ===
    #[error("Failed to read catalog {path}: {source}")]
    CatalogRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    // === Configuration Errors ===
    #[error("Invalid configuration value for '{field}': {message}")]
    InvalidConfig {
        field: &'static str,
        message: String,
    },

    // === Usage Errors ===
    #[error("Invalid job '{input}': {message}")]
    InvalidJob { input: String, message: String },

    // === Output Errors ===
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] png::EncodingError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BadgeError {
    /// Wraps an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true if this error stems from bad caller input rather than
    /// an environmental failure.
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::InvalidJob { .. } | Self::InvalidConfig { .. })
    }
}
