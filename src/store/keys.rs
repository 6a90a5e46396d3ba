//! Key layout and timestamp handling shared by the pruner and the selector.
//!
//! Backup objects live under `<base>/<tier>/<timestamp>.tar.gz` where the
//! timestamp is a UTC instant formatted so that lexicographic order equals
//! chronological order. Both retention pruning and latest-backup selection
//! lean on that property.

use chrono::{DateTime, Utc};
use std::fmt;

pub const ARCHIVE_SUFFIX: &str = ".tar.gz";

/// Sortable RFC 3339 UTC format, e.g. `2020-04-15T12:35:00Z`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// The fixed backup cadences. Each tier keeps its own retention count and
/// cron cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Tier {
    Hourly,
    Daily,
    Weekly,
    Monthly,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Hourly, Tier::Daily, Tier::Weekly, Tier::Monthly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Hourly => "hourly",
            Tier::Daily => "daily",
            Tier::Weekly => "weekly",
            Tier::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.format(TIMESTAMP_FORMAT).to_string()
}

/// Full object key for one backup. An empty base path produces keys with no
/// leading separator.
pub fn object_key(base: &str, tier: Tier, timestamp: &str) -> String {
    if base.is_empty() {
        format!("{tier}/{timestamp}{ARCHIVE_SUFFIX}")
    } else {
        format!("{base}/{tier}/{timestamp}{ARCHIVE_SUFFIX}")
    }
}

/// Listing prefix scoped to one tier. The trailing separator keeps a prefix
/// match on `hourly` from also matching a sibling such as `hourlyX`.
pub fn tier_prefix(base: &str, tier: Tier) -> String {
    if base.is_empty() {
        format!("{tier}/")
    } else {
        format!("{base}/{tier}/")
    }
}

/// Listing prefix spanning every tier under the base path.
pub fn base_prefix(base: &str) -> String {
    if base.is_empty() {
        String::new()
    } else {
        format!("{base}/")
    }
}

/// Key for an operator-named restore object, relative to the base path.
pub fn named_key(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{base}/{name}")
    }
}

/// The sortable timestamp embedded in a key: the segment after the last
/// separator, minus the archive suffix. Comparing these (rather than full
/// keys) keeps differing tier-name lengths from perturbing the order.
pub fn timestamp_component(key: &str) -> &str {
    let name = key.rsplit('/').next().unwrap_or(key);
    name.strip_suffix(ARCHIVE_SUFFIX).unwrap_or(name)
}

/// Pick the key with the greatest embedded timestamp, regardless of tier.
/// Identical timestamps across tiers tie-break on the full key.
pub fn select_latest(listing: &[String]) -> Option<&String> {
    listing.iter().max_by(|a, b| {
        timestamp_component(a)
            .cmp(timestamp_component(b))
            .then_with(|| a.as_str().cmp(b.as_str()))
    })
}
