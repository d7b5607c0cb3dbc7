//! Error types for the livesearch binary
//!
//! The pipeline itself has no failure path (pure matching over in-memory
//! data), so errors only arise at the CLI boundary when loading a people
//! file from disk.

use thiserror::Error;

/// Application error type
#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid people file: {0}")]
    InvalidPeopleFile(#[from] serde_json::Error),
}
