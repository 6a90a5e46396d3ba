//! Tiered tar.gz backups of a data directory to S3.
//!
//! One backup run archives the data directory, uploads it under a
//! tier-scoped key (`<base>/<tier>/<timestamp>.tar.gz`), then prunes that
//! tier down to its retention count. Restore picks the most recent backup
//! across all tiers (or an explicitly named one) and extracts it over the
//! data directory.

pub mod config;
pub mod cron;
pub mod fs;
pub mod ops;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use utils::errors::BackupError;
pub type Result<T> = std::result::Result<T, BackupError>;
