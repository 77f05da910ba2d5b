use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Filters shared by `/repositories` and `/stats`. `owner` may repeat.
#[derive(Debug, Default, PartialEq)]
pub struct RepositoryFilter {
    pub owners: Vec<String>,
    pub top: Option<usize>,
}

impl RepositoryFilter {
    pub fn from_query(query: Option<&str>) -> Result<Self, String> {
        let mut filter = Self::default();
        let Some(query) = query else {
            return Ok(filter);
        };
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "owner" => filter.owners.push(value.into_owned()),
                "top" => {
                    let top = value
                        .parse::<usize>()
                        .map_err(|_| format!("invalid top '{}', expected a non-negative integer", value))?;
                    filter.top = Some(top);
                }
                _ => {}
            }
        }
        Ok(filter)
    }
}
