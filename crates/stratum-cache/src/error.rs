//! Cache-related error types

use thiserror::Error;

/// Boxed error type for caller-supplied factory failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Cache operation errors
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Encoding error: {message}")]
    Encode { message: String },

    #[error("Decoding error: {message}")]
    Decode { message: String },

    #[error("Remote store error: {message}")]
    Remote { message: String },

    #[error("Factory error: {0}")]
    Factory(#[source] BoxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Re-export commonly used Result type
pub type Result<T> = std::result::Result<T, CacheError>;
