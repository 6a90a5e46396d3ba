//! Custom error types for the backup tool.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object store error: {0}")]
    Remote(String),

    #[error("No backup to restore from")]
    NoBackupFound,

    #[error("Ownership normalization failed: {0}")]
    Chown(String),
}

pub type Result<T> = std::result::Result<T, BackupError>;
