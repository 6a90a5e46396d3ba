//! Cadence-driven backups: one cron job per tier with a non-zero retention
//! count, running until the process is interrupted.

use crate::config::Config;
use crate::ops;
use crate::store::keys::Tier;
use crate::store::ObjectStore;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

/// Schedule a backup job for every enabled tier and block until ctrl-c.
/// A failed scheduled run is logged; the next scheduled invocation is the
/// only retry mechanism.
pub async fn run(store: Arc<dyn ObjectStore>, config: Arc<Config>) -> anyhow::Result<()> {
    let mut scheduler = JobScheduler::new().await?;

    for tier in Tier::ALL {
        if config.retention.keep_count(tier) == 0 {
            info!(%tier, "retention disabled, not scheduling");
            continue;
        }

        let expression = config.cadence.expression(tier).to_string();
        let store = store.clone();
        let config = config.clone();
        let job = Job::new_async(expression.as_str(), move |_uuid, _lock| {
            let store = store.clone();
            let config = config.clone();
            Box::pin(async move {
                info!(%tier, "starting scheduled backup");
                if let Err(err) = ops::backup::run(store.as_ref(), &config, tier).await {
                    error!(%tier, error = %err, "scheduled backup failed");
                }
            })
        })?;

        scheduler.add(job).await?;
        info!(%tier, cron = %expression, "tier scheduled");
    }

    scheduler.start().await?;
    info!("cron started");

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    scheduler.shutdown().await?;
    Ok(())
}
