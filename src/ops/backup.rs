//! One backup run: marker file, archive build, upload, prune, cleanup.

use crate::config::Config;
use crate::fs::archive;
use crate::ops::prune;
use crate::store::keys::{self, Tier};
use crate::store::ObjectStore;
use crate::utils::errors::Result;
use chrono::Utc;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Records the tier and timestamp of the most recent backup attempt, written
/// at the root of the data directory so it gets swept into the archive.
pub const MARKER_FILE: &str = "BACKUP_DATE";

/// Run one backup of `tier`: archive the data directory, upload it under a
/// tier-scoped key, then prune the tier to its retention count. Returns the
/// uploaded object's key.
///
/// A prune failure aborts the run but never unwinds the upload. The staging
/// directory is removed on every exit path; a failed removal is logged, not
/// fatal.
pub async fn run(store: &dyn ObjectStore, config: &Config, tier: Tier) -> Result<String> {
    let timestamp = keys::format_timestamp(Utc::now());
    info!(%tier, %timestamp, "starting backup");

    write_marker(&config.data_dir, tier, &timestamp)?;

    let staging = tempfile::Builder::new().prefix("backups-").tempdir()?;
    let archive_path = staging.path().join("backup.tar.gz");

    let outcome = upload_and_prune(store, config, tier, &timestamp, &archive_path).await;

    if let Err(err) = staging.close() {
        warn!(error = %err, "failed to remove staging directory");
    }

    let key = outcome?;
    info!(%tier, %key, "backup complete");
    Ok(key)
}

async fn upload_and_prune(
    store: &dyn ObjectStore,
    config: &Config,
    tier: Tier,
    timestamp: &str,
    archive_path: &Path,
) -> Result<String> {
    archive::build(&config.data_dir, archive_path)?;

    let key = keys::object_key(&config.s3_path, tier, timestamp);
    debug!(%key, "uploading archive");
    store.put(&key, archive_path).await?;

    prune::prune(store, config, tier).await?;
    Ok(key)
}

fn write_marker(data_dir: &Path, tier: Tier, timestamp: &str) -> Result<()> {
    fs::write(data_dir.join(MARKER_FILE), format!("{tier}/{timestamp}\n"))?;
    Ok(())
}
