use std::path::PathBuf;
use std::time::Duration;

use anyhow::{ensure, Context as AnyhowContext, Result};
use url::Url;

const DB_FILE: &str = "gh-harvest.sqlite";

/// Resolved runtime configuration, built once from the CLI and passed to
/// every component.
#[derive(Clone, Debug)]
pub struct Context {
    pub data_dir: PathBuf,
    pub api_url: Url,
    pub github_token: Option<String>,
    pub request_timeout: Duration,
    pub log_file: Option<PathBuf>,
    pub reset: bool,
}

impl Context {
    pub fn from_cli(cli: &crate::cli::Cli) -> Result<Self> {
        let api_url = Url::parse(&cli.api_url)
            .with_context(|| format!("invalid GitHub API URL '{}'", cli.api_url))?;
        ensure!(
            matches!(api_url.scheme(), "http" | "https"),
            "GitHub API URL must be http or https, got '{}'",
            api_url
        );
        ensure!(cli.request_timeout > 0, "--request-timeout must be at least 1 second");

        Ok(Self {
            data_dir: PathBuf::from(&cli.data_dir),
            api_url,
            github_token: cli
                .github_token
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            request_timeout: Duration::from_secs(cli.request_timeout),
            log_file: cli.log_file.as_ref().map(PathBuf::from),
            reset: cli.reset,
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE)
    }

    pub fn github_client(&self) -> Result<crate::github::GithubClient> {
        crate::github::GithubClient::new(
            self.api_url.clone(),
            self.github_token.as_deref(),
            self.request_timeout,
        )
        .context("building GitHub client")
    }
}
