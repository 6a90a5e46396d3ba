//! One restore run: guard, resolve, download, extract, optional chown.

use crate::config::Config;
use crate::fs::extract;
use crate::store::keys;
use crate::store::ObjectStore;
use crate::utils::errors::{BackupError, Result};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

/// How a restore run ended. Declining to touch a non-empty target is a
/// successful no-op, not a failure.
#[derive(Debug, PartialEq, Eq)]
pub enum RestoreOutcome {
    Restored { key: String },
    TargetNotEmpty,
}

/// Restore the data directory from the most recent backup across all tiers,
/// or from the explicitly configured object.
///
/// Extraction is not transactional: a failure partway through leaves a
/// partially restored tree.
pub async fn run(store: &dyn ObjectStore, config: &Config) -> Result<RestoreOutcome> {
    if !config.restore.force && !target_is_empty(&config.data_dir)? {
        info!(
            target = %config.data_dir.display(),
            "target directory is not empty, refusing to restore"
        );
        return Ok(RestoreOutcome::TargetNotEmpty);
    }

    let key = resolve_key(store, config).await?;
    info!(%key, "restoring backup");

    let staging = tempfile::Builder::new().prefix("restore-").tempdir()?;
    let download_path = staging.path().join("backup.tar.gz");

    let outcome = fetch_and_extract(store, config, &key, &download_path).await;

    if let Err(err) = staging.close() {
        warn!(error = %err, "failed to remove staging directory");
    }

    outcome?;
    info!(%key, "restore complete");
    Ok(RestoreOutcome::Restored { key })
}

async fn resolve_key(store: &dyn ObjectStore, config: &Config) -> Result<String> {
    if let Some(name) = &config.restore.object {
        return Ok(keys::named_key(&config.s3_path, name));
    }
    let listing = store.list(&keys::base_prefix(&config.s3_path)).await?;
    keys::select_latest(&listing)
        .cloned()
        .ok_or(BackupError::NoBackupFound)
}

async fn fetch_and_extract(
    store: &dyn ObjectStore,
    config: &Config,
    key: &str,
    download_path: &Path,
) -> Result<()> {
    let bytes = store.get(key, download_path).await?;
    debug!(bytes, "downloaded archive");

    extract::unpack(download_path, &config.data_dir, config.restore.dir_mode)?;

    if let Some(owner) = config.restore.owner {
        debug!(uid = owner.uid, gid = owner.gid, "normalizing ownership");
        extract::normalize_ownership(&config.data_dir, owner.uid, owner.gid)?;
    }
    Ok(())
}

/// A target with any direct entry at all (the marker file included) counts
/// as non-empty. A missing target counts as empty.
fn target_is_empty(dir: &Path) -> Result<bool> {
    match fs::read_dir(dir) {
        Ok(mut entries) => Ok(entries.next().is_none()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(true),
        Err(err) => Err(err.into()),
    }
}
