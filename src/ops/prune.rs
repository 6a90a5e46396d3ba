//! Retention pruning: keep the newest objects of a tier, delete the rest.

use crate::config::Config;
use crate::store::keys::{self, Tier};
use crate::store::ObjectStore;
use crate::utils::errors::Result;
use tracing::{debug, info};

/// Prune `tier` down to its configured retention count. Returns how many
/// objects were deleted; zero means there was nothing to prune.
///
/// A keep count of zero deletes the tier's entire history, so callers
/// disable a tier by not backing it up, not by pruning with zero.
pub async fn prune(store: &dyn ObjectStore, config: &Config, tier: Tier) -> Result<usize> {
    let keep = config.retention.keep_count(tier);
    let prefix = keys::tier_prefix(&config.s3_path, tier);
    let listing = store.list(&prefix).await?;

    let doomed = plan_deletions(listing, keep);
    if doomed.is_empty() {
        debug!(%tier, keep, "nothing to prune");
        return Ok(0);
    }

    store.delete_batch(&doomed).await?;
    info!(%tier, keep, deleted = doomed.len(), "pruned old backups");
    Ok(doomed.len())
}

/// Order keys newest-first by their embedded timestamp and return everything
/// past the first `keep`.
pub fn plan_deletions(mut listing: Vec<String>, keep: usize) -> Vec<String> {
    listing.sort_by(|a, b| {
        keys::timestamp_component(b)
            .cmp(keys::timestamp_component(a))
            .then_with(|| b.cmp(a))
    });
    if listing.len() <= keep {
        return Vec::new();
    }
    listing.split_off(keep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use std::collections::HashMap;
    use std::sync::atomic::Ordering;

    fn hourly_key(timestamp: &str) -> String {
        format!("backups/hourly/{timestamp}.tar.gz")
    }

    fn test_config(extra: &[(&str, &str)]) -> Config {
        let mut vars: HashMap<String, String> = HashMap::from([
            ("S3_BUCKET".into(), "bucket".into()),
            ("S3_PATH".into(), "backups".into()),
        ]);
        for (name, value) in extra {
            vars.insert(name.to_string(), value.to_string());
        }
        Config::from_lookup(|name| vars.get(name).cloned()).unwrap()
    }

    #[test]
    fn plan_keeps_the_newest_and_dooms_the_rest() {
        let listing = vec![
            hourly_key("2020-04-15T10:00:00Z"),
            hourly_key("2020-04-15T12:00:00Z"),
            hourly_key("2020-04-15T11:00:00Z"),
            hourly_key("2020-04-15T09:00:00Z"),
        ];
        let doomed = plan_deletions(listing, 2);
        assert_eq!(
            doomed,
            vec![
                hourly_key("2020-04-15T10:00:00Z"),
                hourly_key("2020-04-15T09:00:00Z"),
            ]
        );
    }

    #[test]
    fn plan_is_empty_when_listing_fits_the_keep_count() {
        let listing = vec![hourly_key("2020-04-15T10:00:00Z")];
        assert!(plan_deletions(listing, 3).is_empty());
    }

    #[test]
    fn plan_with_zero_keep_dooms_everything() {
        let listing = vec![
            hourly_key("2020-04-15T10:00:00Z"),
            hourly_key("2020-04-15T11:00:00Z"),
        ];
        assert_eq!(plan_deletions(listing, 0).len(), 2);
    }

    #[tokio::test]
    async fn prune_scopes_strictly_to_the_tier() {
        let store = MemoryStore::default();
        store.seed(&hourly_key("2020-04-15T10:00:00Z"), b"old");
        store.seed(&hourly_key("2020-04-15T11:00:00Z"), b"new");
        store.seed("backups/hourlyX/2020-04-15T09:00:00Z.tar.gz", b"sibling");
        store.seed("backups/daily/2020-04-15T09:00:00Z.tar.gz", b"other tier");

        let config = test_config(&[("NUM_BACKUPS_HOURLY", "1")]);
        let deleted = prune(&store, &config, Tier::Hourly).await.unwrap();

        assert_eq!(deleted, 1);
        assert_eq!(
            store.keys(),
            vec![
                "backups/daily/2020-04-15T09:00:00Z.tar.gz".to_string(),
                hourly_key("2020-04-15T11:00:00Z"),
                "backups/hourlyX/2020-04-15T09:00:00Z.tar.gz".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn prune_with_nothing_to_delete_makes_no_delete_call() {
        let store = MemoryStore::default();
        store.seed(&hourly_key("2020-04-15T10:00:00Z"), b"only");

        let config = test_config(&[("NUM_BACKUPS_HOURLY", "3")]);
        let deleted = prune(&store, &config, Tier::Hourly).await.unwrap();

        assert_eq!(deleted, 0);
        assert_eq!(store.delete_calls.load(Ordering::SeqCst), 0);
    }
}
