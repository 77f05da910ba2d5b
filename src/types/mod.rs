mod harvest_error;
mod repository;

pub use harvest_error::{HarvestError, NormalizeError, PersistenceError};
pub use repository::{normalize, RepositoryRecord, NOT_AVAILABLE};
