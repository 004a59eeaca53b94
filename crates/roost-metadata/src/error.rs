//! Error types for metadata resolution

use thiserror::Error;

/// Error type for metadata operations.
///
/// The transport maps every variant to a plain 404 with an empty body; the
/// distinctions exist for logging, never for the wire.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// A path segment falls outside the allowed character set, or the
    /// token sequence has no mapping
    #[error("invalid metadata path: {0}")]
    InvalidPath(String),

    /// A version token for a schema we recognize but do not serve
    #[error("unsupported metadata schema: {0}")]
    UnsupportedSchema(String),

    /// A public-keys index that is not a number or not in range
    #[error("invalid public-keys index: {0}")]
    InvalidKeyIndex(String),

    /// A backing-store lookup failed (missing entry, permissions, I/O)
    #[error("metadata not found: {path}")]
    NotFound {
        /// The physical path that failed to open
        path: String,
        /// The underlying I/O error, logged but never sent to the client
        #[source]
        source: std::io::Error,
    },
}

/// Result type for metadata operations
pub type Result<T> = std::result::Result<T, MetadataError>;
