use serde::{Deserialize, Serialize};

use crate::storage::StorageRead;
use crate::types::{PersistenceError, RepositoryRecord};

/// Public shape of a stored repository, as served by the API and printed by
/// the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryView {
    pub id: i64,
    pub owner: String,
    pub name: String,
    pub description: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub last_updated: Option<String>,
    pub language: Option<String>,
    pub url: String,
    pub collected_at: String,
}

impl From<RepositoryRecord> for RepositoryView {
    fn from(record: RepositoryRecord) -> Self {
        Self {
            id: record.id,
            owner: record.owner,
            name: record.name,
            description: record.description,
            stars: record.stars,
            forks: record.forks,
            last_updated: record.last_updated,
            language: record.language,
            url: record.url,
            collected_at: record.collected_at.to_rfc3339(),
        }
    }
}

/// Every stored repository whose owner is in `owners`, or all of them when
/// the filter is empty. Rows come back unsorted.
pub fn query_repositories<S: StorageRead + ?Sized>(
    store: &S,
    owners: &[String],
) -> Result<Vec<RepositoryView>, PersistenceError> {
    let owners = normalize_filter(owners);
    let rows = store.list_repositories(&owners)?;
    Ok(rows.into_iter().map(RepositoryView::from).collect())
}

/// One stored repository by its GitHub id.
pub fn find_repository<S: StorageRead + ?Sized>(
    store: &S,
    id: i64,
) -> Result<Option<RepositoryView>, PersistenceError> {
    Ok(store.load_repository(id)?.map(RepositoryView::from))
}

pub fn list_owners<S: StorageRead + ?Sized>(store: &S) -> Result<Vec<String>, PersistenceError> {
    store.list_owners()
}

// Blank entries (`?owner=`) are dropped rather than matched literally.
fn normalize_filter(owners: &[String]) -> Vec<String> {
    let mut out = crate::harvest::clean_owners(owners);
    out.sort();
    out
}
