use std::time::Duration;

use anyhow::{ensure, Context as _, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use serde_json::Value;
use url::Url;

use super::RepoApi;
use crate::types::HarvestError;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const ACCEPT_GITHUB_JSON: &str = "application/vnd.github+json";

/// Blocking GitHub REST client. Every request is bounded by the configured
/// timeout; failures are mapped onto [`HarvestError`] and never retried.
pub struct GithubClient {
    http: Client,
    base: Url,
}

impl GithubClient {
    pub fn new(base: Url, token: Option<&str>, timeout: Duration) -> Result<Self> {
        ensure!(
            !base.cannot_be_a_base(),
            "GitHub API base {} cannot carry a path",
            base
        );

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_GITHUB_JSON));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("gh-harvest/", env!("CARGO_PKG_VERSION"))),
        );
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                .context("GitHub token contains characters not allowed in a header")?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("building HTTP client")?;

        Ok(Self {
            http,
            base: with_trailing_slash(base),
        })
    }

    /// `{base}/users/{owner}/repos`
    pub fn owner_repos_url(&self, owner: &str) -> Url {
        let mut url = self.base.clone();
        // `new` only accepts bases that can be extended with path segments.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["users", owner, "repos"]);
        }
        url
    }

    /// Generic paged GET: `resource?per_page=N&page=P`, body must be a JSON
    /// array.
    pub fn get_page(&self, resource: &Url, page: u32, per_page: u32) -> Result<Vec<Value>, HarvestError> {
        let response = self
            .http
            .get(resource.clone())
            .query(&[("per_page", per_page), ("page", page)])
            .send()
            .map_err(|e| HarvestError::TransientNetwork {
                page,
                status: e.status().map(|s| s.as_u16()),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            log::error!(
                "❌ GET {} page {} failed with {}: {}",
                resource,
                page,
                status,
                body.trim()
            );
            return Err(classify_status(status, resource, page, &body));
        }

        let body: Value = response.json().map_err(|e| HarvestError::MalformedPage {
            page,
            reason: e.to_string(),
        })?;
        match body {
            Value::Array(items) => Ok(items),
            other => Err(HarvestError::MalformedPage {
                page,
                reason: format!("expected a JSON array, got {}", json_kind(&other)),
            }),
        }
    }
}

impl RepoApi for GithubClient {
    fn fetch_page(&self, owner: &str, page: u32, per_page: u32) -> Result<Vec<Value>, HarvestError> {
        let resource = self.owner_repos_url(owner);
        self.get_page(&resource, page, per_page)
    }
}

fn classify_status(status: StatusCode, resource: &Url, page: u32, body: &str) -> HarvestError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => HarvestError::Auth {
            status: status.as_u16(),
            page,
        },
        StatusCode::NOT_FOUND => HarvestError::NotFound {
            resource: resource.path().trim_start_matches('/').to_string(),
            page,
        },
        _ => HarvestError::TransientNetwork {
            page,
            status: Some(status.as_u16()),
            reason: api_message(body).unwrap_or_else(|| status.to_string()),
        },
    }
}

/// GitHub error bodies look like `{"message": "..."}`.
fn api_message(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
