//! Error types for the deduplication engine

use thiserror::Error;

/// Core deduplication errors
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;
