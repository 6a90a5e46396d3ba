//! Configuration for backup, restore and cron runs.
//!
//! Built once at process start from environment variables and passed into
//! the orchestrators; nothing below `main` performs ambient lookups. An
//! empty variable counts as unset.

use crate::store::keys::Tier;
use crate::utils::errors::{BackupError, Result};
use std::path::PathBuf;

const DEFAULT_DATA_DIR: &str = "/data";
const DEFAULT_RETENTION: usize = 3;
const DEFAULT_DIR_MODE: u32 = 0o755;
const DEFAULT_CHOWN_ID: u32 = 1000;

// Cadence expressions are seconds-first: top of every hour, 01:10 daily,
// 02:10 on Sundays, 03:10 on the first of the month.
const DEFAULT_CADENCE_HOURLY: &str = "0 0 * * * *";
const DEFAULT_CADENCE_DAILY: &str = "0 10 1 * * *";
const DEFAULT_CADENCE_WEEKLY: &str = "0 10 2 * * 0";
const DEFAULT_CADENCE_MONTHLY: &str = "0 10 3 1 * *";

#[derive(Debug, Clone)]
pub struct Config {
    /// Bucket holding all backup objects.
    pub s3_bucket: String,

    /// Key prefix under which tiers live, no trailing separator. May be
    /// empty, in which case tier prefixes sit at the bucket root.
    pub s3_path: String,

    /// The directory that gets archived on backup and repopulated on restore.
    pub data_dir: PathBuf,

    pub retention: Retention,
    pub cadence: Cadence,
    pub restore: RestoreConfig,
}

/// How many backups to keep per tier. Zero disables a tier in the cron; it
/// is never passed to the pruner for an active tier since that would destroy
/// the tier's history.
#[derive(Debug, Clone)]
pub struct Retention {
    pub hourly: usize,
    pub daily: usize,
    pub weekly: usize,
    pub monthly: usize,
}

impl Retention {
    pub fn keep_count(&self, tier: Tier) -> usize {
        match tier {
            Tier::Hourly => self.hourly,
            Tier::Daily => self.daily,
            Tier::Weekly => self.weekly,
            Tier::Monthly => self.monthly,
        }
    }
}

/// Per-tier cron expressions for the `cron` subcommand.
#[derive(Debug, Clone)]
pub struct Cadence {
    pub hourly: String,
    pub daily: String,
    pub weekly: String,
    pub monthly: String,
}

impl Cadence {
    pub fn expression(&self, tier: Tier) -> &str {
        match tier {
            Tier::Hourly => &self.hourly,
            Tier::Daily => &self.daily,
            Tier::Weekly => &self.weekly,
            Tier::Monthly => &self.monthly,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RestoreConfig {
    /// Restore over a non-empty data directory instead of refusing.
    pub force: bool,

    /// Explicit object to restore, relative to the base path. Bypasses
    /// latest-backup selection.
    pub object: Option<String>,

    /// Mode for directories created during extraction.
    pub dir_mode: u32,

    /// When set, the restored tree is chowned to this owner as a final phase.
    pub owner: Option<Ownership>,
}

#[derive(Debug, Clone, Copy)]
pub struct Ownership {
    pub uid: u32,
    pub gid: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup. Tests inject a map
    /// here instead of mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.is_empty());

        let s3_bucket = get("S3_BUCKET").ok_or_else(|| {
            BackupError::Config("required environment variable S3_BUCKET is not set".into())
        })?;

        let s3_path = get("S3_PATH")
            .unwrap_or_else(|| "/".into())
            .trim_end_matches('/')
            .to_string();

        let data_dir = PathBuf::from(
            get("DATA_DIRECTORY")
                .map(|dir| dir.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_DATA_DIR.into()),
        );

        let retention = Retention {
            hourly: parse_count(&get, "NUM_BACKUPS_HOURLY")?,
            daily: parse_count(&get, "NUM_BACKUPS_DAILY")?,
            weekly: parse_count(&get, "NUM_BACKUPS_WEEKLY")?,
            monthly: parse_count(&get, "NUM_BACKUPS_MONTHLY")?,
        };

        let cadence = Cadence {
            hourly: get("CADENCE_HOURLY").unwrap_or_else(|| DEFAULT_CADENCE_HOURLY.into()),
            daily: get("CADENCE_DAILY").unwrap_or_else(|| DEFAULT_CADENCE_DAILY.into()),
            weekly: get("CADENCE_WEEKLY").unwrap_or_else(|| DEFAULT_CADENCE_WEEKLY.into()),
            monthly: get("CADENCE_MONTHLY").unwrap_or_else(|| DEFAULT_CADENCE_MONTHLY.into()),
        };

        let owner = if parse_bool(&get, "CHOWN_ENABLE") {
            Some(Ownership {
                uid: parse_id(&get, "CHOWN_UID")?,
                gid: parse_id(&get, "CHOWN_GID")?,
            })
        } else {
            None
        };

        let restore = RestoreConfig {
            force: parse_bool(&get, "RESTORE_FORCE"),
            object: get("RESTORE_FILE"),
            dir_mode: parse_mode(&get, "DIRECTORY_PERMISSIONS")?,
            owner,
        };

        Ok(Config {
            s3_bucket,
            s3_path,
            data_dir,
            retention,
            cadence,
            restore,
        })
    }
}

fn parse_count(get: &dyn Fn(&str) -> Option<String>, name: &str) -> Result<usize> {
    match get(name) {
        None => Ok(DEFAULT_RETENTION),
        Some(value) => value.parse().map_err(|_| {
            BackupError::Config(format!(
                "environment variable {name} expected an integer, got {value:?}"
            ))
        }),
    }
}

fn parse_id(get: &dyn Fn(&str) -> Option<String>, name: &str) -> Result<u32> {
    match get(name) {
        None => Ok(DEFAULT_CHOWN_ID),
        Some(value) => value.parse().map_err(|_| {
            BackupError::Config(format!(
                "environment variable {name} expected an integer, got {value:?}"
            ))
        }),
    }
}

// Permission bits are given in octal, e.g. DIRECTORY_PERMISSIONS=750.
fn parse_mode(get: &dyn Fn(&str) -> Option<String>, name: &str) -> Result<u32> {
    match get(name) {
        None => Ok(DEFAULT_DIR_MODE),
        Some(value) => u32::from_str_radix(&value, 8).map_err(|_| {
            BackupError::Config(format!(
                "environment variable {name} expected octal permission bits, got {value:?}"
            ))
        }),
    }
}

fn parse_bool(get: &dyn Fn(&str) -> Option<String>, name: &str) -> bool {
    get(name).is_some_and(|value| value == "true")
}
