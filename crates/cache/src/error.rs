//! Cache error types

use thiserror::Error;

/// Errors raised by a key-value store
///
/// The read-through path treats every one of these as a soft failure. They
/// only reach callers from administrative operations such as invalidation.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Store could not be reached or refused the operation
    #[error("cache store unavailable: {0}")]
    Unavailable(String),

    /// Invalid key pattern
    #[error("invalid key pattern '{pattern}': {message}")]
    Pattern {
        /// The rejected pattern
        pattern: String,
        /// Parser message
        message: String,
    },
}

/// Result type for cache store operations
pub type Result<T> = std::result::Result<T, CacheError>;
