use thiserror::Error;

/// Fatal failures of a harvest run. None of them is retried.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("credential rejected with HTTP {status} on page {page}")]
    Auth { status: u16, page: u32 },
    #[error("resource {resource} not found (HTTP 404) on page {page}")]
    NotFound { resource: String, page: u32 },
    #[error("network failure on page {page}{}: {reason}", status_suffix(.status))]
    TransientNetwork {
        page: u32,
        status: Option<u16>,
        reason: String,
    },
    #[error("malformed response on page {page}: {reason}")]
    MalformedPage { page: u32, reason: String },
    #[error("repository #{index} could not be normalized: {source}")]
    Normalize {
        index: usize,
        #[source]
        source: NormalizeError,
    },
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {code})"),
        None => String::new(),
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("expected a JSON object")]
    NotAnObject,
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` is malformed: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Row-level failure; the sink skips the row and keeps going.
    #[error("repository {id} ({url}) violates a table constraint: {message}")]
    Constraint { id: i64, url: String, message: String },
    #[error("corrupt value in column `{column}`: {reason}")]
    Corrupt { column: &'static str, reason: String },
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl PersistenceError {
    pub fn is_row_level(&self) -> bool {
        matches!(self, PersistenceError::Constraint { .. })
    }
}
