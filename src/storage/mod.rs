pub mod sink;
pub mod sqlite;
pub mod traits;

pub use sink::{persist, PersistOutcome};
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageRead, StorageWrite};
