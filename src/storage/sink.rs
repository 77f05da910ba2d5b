use chrono::Utc;

use super::traits::{Result, StorageWrite};
use crate::types::RepositoryRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistOutcome {
    pub written: usize,
    pub skipped: usize,
}

/// Upserts `records` one by one under the `owner` label, stamping each row
/// with the time it is written.
///
/// A row that trips a table constraint is logged and skipped. Any other
/// failure means the connection is unusable and is returned to the caller.
pub fn persist<W: StorageWrite + ?Sized>(
    store: &W,
    owner: &str,
    records: &[RepositoryRecord],
) -> Result<PersistOutcome> {
    let mut outcome = PersistOutcome::default();

    for record in records {
        let row = RepositoryRecord {
            owner: owner.to_string(),
            collected_at: Utc::now(),
            ..record.clone()
        };
        match store.upsert_repository(&row) {
            Ok(()) => outcome.written += 1,
            Err(e) if e.is_row_level() => {
                log::warn!("⚠️ skipping repository {} ({}): {}", row.name, row.id, e);
                outcome.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    log::debug!(
        "persisted {} repositories for {} ({} skipped)",
        outcome.written,
        owner,
        outcome.skipped
    );
    Ok(outcome)
}
