use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use tokio_util::sync::CancellationToken;

use crate::context::Context;
use crate::harvest::{HarvestReport, Harvester};
use crate::storage::SqliteStorage;

/// Re-harvests a fixed owner list on an interval until cancelled. A failed
/// run is logged and the loop carries on with the next tick.
pub struct Scheduler<J> {
    owners: Vec<String>,
    every: Duration,
    job: Arc<J>,
}

impl<J> Scheduler<J>
where
    J: Fn(&[String]) -> Result<Vec<HarvestReport>> + Send + Sync + 'static,
{
    pub fn new(owners: Vec<String>, every: Duration, job: J) -> Self {
        Self {
            owners,
            every,
            job: Arc::new(job),
        }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        log::info!(
            "⏰ Harvesting {} every {:?}",
            self.owners.join(", "),
            self.every
        );
        let mut runs: u64 = 0;

        while !shutdown.is_cancelled() {
            runs += 1;
            let job = self.job.clone();
            let owners = self.owners.clone();
            match tokio::task::spawn_blocking(move || job(&owners)).await {
                Ok(Ok(reports)) => {
                    let written: usize = reports.iter().map(|r| r.written).sum();
                    log::info!("✅ Scheduled run #{} finished, {} rows written", runs, written);
                }
                Ok(Err(e)) => log::error!("❌ Scheduled run #{} failed: {:#}", runs, e),
                Err(e) => log::error!("❌ Scheduled run #{} panicked: {}", runs, e),
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.every) => {}
            }
        }
        log::info!("👋 Scheduler stopped after {} runs", runs);
    }
}

/// The production job: a fresh GitHub client and storage handle per run.
pub fn github_job(ctx: Context) -> impl Fn(&[String]) -> Result<Vec<HarvestReport>> + Send + Sync {
    move |owners: &[String]| {
        let client = ctx.github_client()?;
        let harvester = Harvester::new(client, SqliteStorage::new(ctx.db_path()));
        harvester
            .harvest_all(owners)
            .context("scheduled harvest failed")
    }
}
