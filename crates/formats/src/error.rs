//! Error types for dump loading and record extraction

use std::path::PathBuf;
use thiserror::Error;

/// Format errors
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dump is not valid UTF-8: {}", path.display())]
    Encoding { path: PathBuf },
}

/// Result type alias for format operations
pub type Result<T> = std::result::Result<T, Error>;
