use clap::Parser;
use std::env;

use crate::cli::command::Command;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Harvest GitHub repository metadata into SQLite and serve it back",
    long_about = "Collects every public repository of one or more GitHub accounts, upserts them into a local SQLite table keyed by repository id, and exposes the result through CLI read commands and a JSON HTTP API.",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[arg(
        long,
        env = "GH_HARVEST_DATA_DIR",
        default_value = ".gh-harvest/",
        value_name = "DIR",
        global = true,
        help = "Directory holding the SQLite database"
    )]
    pub data_dir: String,

    #[arg(
        long = "api-url",
        env = "GITHUB_API_URL",
        default_value = crate::github::client::DEFAULT_API_URL,
        value_name = "URL",
        global = true,
        help = "GitHub REST API base URL"
    )]
    pub api_url: String,

    #[arg(
        long = "github-token",
        env = "GITHUB_TOKEN",
        value_name = "TOKEN",
        hide_env_values = true,
        global = true,
        help = "Bearer token sent to the GitHub API (optional, raises rate limits)"
    )]
    pub github_token: Option<String>,

    #[arg(
        long = "request-timeout",
        env = "GH_HARVEST_REQUEST_TIMEOUT",
        default_value_t = crate::github::client::DEFAULT_TIMEOUT.as_secs(),
        value_name = "SECS",
        global = true,
        help = "Per-request timeout for GitHub API calls"
    )]
    pub request_timeout: u64,

    #[arg(
        long = "log-file",
        env = "GH_HARVEST_LOG_FILE",
        value_name = "PATH",
        global = true,
        help = "Write logs to PATH (in addition to stderr)"
    )]
    pub log_file: Option<String>,

    #[arg(
        long,
        default_value_t = false,
        global = true,
        help = "Reset all persisted state (delete the SQLite database) before starting"
    )]
    pub reset: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

pub fn parse() -> Cli {
    let dotenv_path = env::var("DOTENV_PATH").unwrap_or(".env".into());
    dotenvy::from_filename(&dotenv_path).ok();

    Cli::parse()
}
