use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, params_from_iter, types::Type, Connection, ErrorCode, OptionalExtension};
use std::path::Path;

use super::traits::{Result, Storage, StorageRead, StorageWrite};
use crate::types::{PersistenceError, RepositoryRecord};

const DB_SCHEMA_VERSION: i64 = 1;

const REPOSITORY_COLUMNS: &str =
    "id, owner, name, description, url, stars, forks, language, last_updated, collected_at";

// Stays well under SQLITE_MAX_VARIABLE_NUMBER.
const OWNER_CHUNK: usize = 900;

#[derive(Clone)]
pub struct SqliteStorage {
    pub path: String,
}

/// One connection held for the duration of a harvest run. Statements run in
/// autocommit mode, so every upsert is its own transaction.
pub struct SqliteSession {
    conn: Connection,
}

fn open(path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.busy_timeout(std::time::Duration::from_millis(500))?;
    Ok(conn)
}

fn map_repository_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RepositoryRecord> {
    let stars_int: i64 = row.get(5)?;
    let stars: u64 = stars_int
        .try_into()
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(5, Type::Integer, Box::new(err)))?;

    let forks_int: i64 = row.get(6)?;
    let forks: u64 = forks_int
        .try_into()
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(6, Type::Integer, Box::new(err)))?;

    let collected_at_str: String = row.get(9)?;
    let collected_at = DateTime::parse_from_rfc3339(&collected_at_str)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(err)))?
        .with_timezone(&Utc);

    Ok(RepositoryRecord {
        id: row.get(0)?,
        owner: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        url: row.get(4)?,
        stars,
        forks,
        language: row.get(7)?,
        last_updated: row.get(8)?,
        collected_at,
    })
}

fn db_load_repository(conn: &Connection, id: i64) -> rusqlite::Result<Option<RepositoryRecord>> {
    conn.query_row(
        &format!("SELECT {REPOSITORY_COLUMNS} FROM repositories WHERE id = ?1"),
        params![id],
        map_repository_row,
    )
    .optional()
}

fn db_list_repositories(
    conn: &Connection,
    owners: &[String],
) -> rusqlite::Result<Vec<RepositoryRecord>> {
    if owners.is_empty() {
        let mut stmt = conn.prepare(&format!("SELECT {REPOSITORY_COLUMNS} FROM repositories"))?;
        let rows = stmt
            .query_map([], map_repository_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        return Ok(rows);
    }

    let mut out = Vec::new();
    for chunk in owners.chunks(OWNER_CHUNK) {
        let placeholders = vec!["?"; chunk.len()].join(", ");
        let sql = format!(
            "SELECT {REPOSITORY_COLUMNS} FROM repositories WHERE owner IN ({placeholders})"
        );
        let mut stmt = conn.prepare(&sql)?;
        let mapped = stmt
            .query_map(params_from_iter(chunk.iter()), map_repository_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        out.extend(mapped);
    }
    Ok(out)
}

fn db_list_owners(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT DISTINCT owner FROM repositories ORDER BY owner")?;
    let owners = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(owners)
}

fn db_upsert_repository(conn: &Connection, record: &RepositoryRecord) -> Result<()> {
    let stars = i64::try_from(record.stars).map_err(|_| PersistenceError::Corrupt {
        column: "stars",
        reason: format!("{} overflows an SQLite integer", record.stars),
    })?;
    let forks = i64::try_from(record.forks).map_err(|_| PersistenceError::Corrupt {
        column: "forks",
        reason: format!("{} overflows an SQLite integer", record.forks),
    })?;
    let collected_at = record
        .collected_at
        .to_rfc3339_opts(SecondsFormat::Micros, true);

    let result = conn.execute(
        r#"
        INSERT INTO repositories (
            id, owner, name, description, url, stars, forks, language, last_updated, collected_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT(id) DO UPDATE SET
            owner=excluded.owner,
            name=excluded.name,
            description=excluded.description,
            url=excluded.url,
            stars=excluded.stars,
            forks=excluded.forks,
            language=excluded.language,
            last_updated=excluded.last_updated,
            collected_at=excluded.collected_at
        "#,
        params![
            record.id,
            record.owner,
            record.name,
            record.description,
            record.url,
            stars,
            forks,
            record.language,
            record.last_updated,
            collected_at
        ],
    );

    match result {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(err, message))
            if err.code == ErrorCode::ConstraintViolation =>
        {
            Err(PersistenceError::Constraint {
                id: record.id,
                url: record.url.clone(),
                message: message.unwrap_or_else(|| err.to_string()),
            })
        }
        Err(err) => Err(err.into()),
    }
}

impl StorageRead for SqliteSession {
    fn load_repository(&self, id: i64) -> Result<Option<RepositoryRecord>> {
        Ok(db_load_repository(&self.conn, id)?)
    }

    fn list_repositories(&self, owners: &[String]) -> Result<Vec<RepositoryRecord>> {
        Ok(db_list_repositories(&self.conn, owners)?)
    }

    fn list_owners(&self) -> Result<Vec<String>> {
        Ok(db_list_owners(&self.conn)?)
    }
}

impl StorageWrite for SqliteSession {
    fn upsert_repository(&self, record: &RepositoryRecord) -> Result<()> {
        db_upsert_repository(&self.conn, record)
    }
}

impl Storage for SqliteStorage {
    type Session = SqliteSession;

    fn open_session(&self) -> Result<Self::Session> {
        let conn = open(&self.path)?;
        Self::migrate(&conn)?;
        Ok(SqliteSession { conn })
    }
}

impl SqliteStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_string_lossy().to_string(),
        }
    }

    pub fn reset_all(&self) -> anyhow::Result<()> {
        for suffix in ["", "-wal", "-shm"] {
            let path = format!("{}{}", self.path, suffix);
            if Path::new(&path).exists() {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    pub fn init(&self) -> Result<()> {
        self.with_conn(|_conn| Ok(()))?;
        Ok(())
    }

    fn with_conn<F, T>(&self, f: F) -> rusqlite::Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = open(&self.path)?;
        Self::migrate(&conn)?;
        f(&conn)
    }

    fn migrate(conn: &Connection) -> rusqlite::Result<()> {
        let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

        if version == DB_SCHEMA_VERSION {
            return Ok(());
        }

        if version == 0 {
            log::info!(
                "SQLite schema migration: {} -> {}",
                version,
                DB_SCHEMA_VERSION
            );
            conn.execute_batch(
                r#"
            CREATE TABLE IF NOT EXISTS repositories (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                owner TEXT NOT NULL,
                description TEXT,
                stars INTEGER NOT NULL CHECK (stars >= 0),
                forks INTEGER NOT NULL CHECK (forks >= 0),
                last_updated TEXT,
                language TEXT,
                url TEXT NOT NULL UNIQUE,
                collected_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS repositories_owner_idx ON repositories(owner);
            "#,
            )?;
            conn.pragma_update(None, "user_version", DB_SCHEMA_VERSION)?;
            return Ok(());
        }

        Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_SCHEMA),
            Some("database schema version mismatch; please run with --reset option".to_string()),
        ))
    }
}

impl StorageRead for SqliteStorage {
    fn load_repository(&self, id: i64) -> Result<Option<RepositoryRecord>> {
        let row = self.with_conn(|conn| db_load_repository(conn, id))?;
        Ok(row)
    }

    fn list_repositories(&self, owners: &[String]) -> Result<Vec<RepositoryRecord>> {
        let rows = self.with_conn(|conn| db_list_repositories(conn, owners))?;
        Ok(rows)
    }

    fn list_owners(&self) -> Result<Vec<String>> {
        let owners = self.with_conn(db_list_owners)?;
        Ok(owners)
    }
}
