use std::time::{Duration, Instant};

use crate::github::{Pages, RepoApi};
use crate::storage::{self, Storage};
use crate::types::{normalize, HarvestError, RepositoryRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestReport {
    pub owner: String,
    pub pages: u32,
    pub fetched: usize,
    pub written: usize,
    pub skipped: usize,
    pub elapsed: Duration,
}

/// Trims owner names and drops blanks and repeats, keeping first-seen order.
/// Comma-split flags like `acme, globex` would otherwise request `users/%20globex`.
pub fn clean_owners(owners: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(owners.len());
    for owner in owners.iter().map(|o| o.trim()).filter(|o| !o.is_empty()) {
        if !out.iter().any(|seen| seen == owner) {
            out.push(owner.to_string());
        }
    }
    out
}

/// Runs harvests: fetch every page, normalize every object, then upsert
/// every record through one storage session. Nothing is written unless the
/// first two stages succeed completely.
pub struct Harvester<A: RepoApi, S: Storage> {
    api: A,
    storage: S,
}

impl<A: RepoApi, S: Storage> Harvester<A, S> {
    pub fn new(api: A, storage: S) -> Self {
        Self { api, storage }
    }

    pub fn harvest(&self, owner: &str) -> Result<HarvestReport, HarvestError> {
        let _span = tracing::info_span!("harvest", owner).entered();
        let started = Instant::now();
        log::info!("🔎 Harvesting repositories for {}", owner);

        let (pages, raw) = Pages::new(&self.api, owner)
            .collect_items()
            .inspect_err(|e| log::error!("❌ Collection for {} aborted: {}", owner, e))?;
        log::info!("📥 Fetched {} repositories over {} pages", raw.len(), pages);

        let records = raw
            .iter()
            .enumerate()
            .map(|(index, value)| {
                normalize(value, owner).map_err(|source| HarvestError::Normalize { index, source })
            })
            .collect::<Result<Vec<RepositoryRecord>, _>>()
            .inspect_err(|e| log::error!("❌ Normalization for {} failed: {}", owner, e))?;

        let session = self.storage.open_session()?;
        let outcome = storage::persist(&session, owner, &records)?;

        let report = HarvestReport {
            owner: owner.to_string(),
            pages,
            fetched: records.len(),
            written: outcome.written,
            skipped: outcome.skipped,
            elapsed: started.elapsed(),
        };
        log::info!(
            "💾 {}: {} written, {} skipped in {:.1?}",
            owner,
            report.written,
            report.skipped,
            report.elapsed
        );
        Ok(report)
    }

    /// Harvests owners in order, stopping at the first fatal error.
    pub fn harvest_all(&self, owners: &[String]) -> Result<Vec<HarvestReport>, HarvestError> {
        clean_owners(owners)
            .iter()
            .map(|owner| self.harvest(owner))
            .collect()
    }
}
