use crate::types::{PersistenceError, RepositoryRecord};

pub type Result<T> = std::result::Result<T, PersistenceError>;

pub trait StorageRead {
    fn load_repository(&self, id: i64) -> Result<Option<RepositoryRecord>>;
    /// Rows whose owner is in `owners`; every row when `owners` is empty.
    fn list_repositories(&self, owners: &[String]) -> Result<Vec<RepositoryRecord>>;
    /// Distinct owners, ascending.
    fn list_owners(&self) -> Result<Vec<String>>;
}

pub trait StorageWrite {
    /// Insert, or overwrite in place when a row with the same id exists.
    fn upsert_repository(&self, record: &RepositoryRecord) -> Result<()>;
}

/// A single open connection, used for the whole of a harvest run.
pub trait StorageSession: StorageRead + StorageWrite {}

impl<T: StorageRead + StorageWrite> StorageSession for T {}

pub trait Storage: StorageRead {
    type Session: StorageSession;

    fn open_session(&self) -> Result<Self::Session>;
}
