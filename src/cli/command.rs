use clap::{Args, Subcommand};

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    #[command(
        about = "Harvest repositories of one or more owners",
        long_about = "Fetch every page of each owner's public repository listing, normalize the results and upsert them into the database. The run aborts on the first authentication, not-found or network failure; rows that collide on URL with another repository are skipped."
    )]
    Harvest {
        #[arg(
            long = "owner",
            value_name = "NAME",
            value_delimiter = ',',
            required = true,
            help = "GitHub account to harvest (repeatable)"
        )]
        owners: Vec<String>,
    },
    #[command(about = "List stored repositories")]
    List {
        #[arg(
            long = "owner",
            value_name = "NAME",
            help = "Only show repositories of this owner (repeatable)"
        )]
        owners: Vec<String>,
        #[arg(long, default_value_t = false, help = "Print JSON instead of a summary")]
        json: bool,
    },
    #[command(
        about = "Export stored repositories to CSV",
        long_about = "Write one CSV row per stored repository, with a header row naming the same fields the API serves. Missing descriptions, languages and update times are left empty."
    )]
    Export {
        #[arg(
            long = "owner",
            value_name = "NAME",
            help = "Only export repositories of this owner (repeatable)"
        )]
        owners: Vec<String>,
        #[arg(
            long,
            short = 'o',
            value_name = "PATH",
            default_value = "github_repos.csv",
            help = "CSV file to write (overwritten if present)"
        )]
        output: std::path::PathBuf,
    },
    #[command(about = "List owners present in the database")]
    Owners,
    #[command(
        about = "Print aggregate repository statistics",
        long_about = "Mean and median stars and forks, top repositories by stars and forks, most common languages and the number of repositories updated in the last six months."
    )]
    Stats {
        #[arg(long = "owner", value_name = "NAME", help = "Restrict to this owner (repeatable)")]
        owners: Vec<String>,
        #[arg(
            long,
            default_value_t = crate::stats::DEFAULT_TOP,
            value_name = "N",
            help = "Length of the ranked lists"
        )]
        top: usize,
        #[arg(long, default_value_t = false, help = "Print JSON instead of text")]
        json: bool,
    },
    #[command(
        about = "Serve the read API",
        long_about = "Run the JSON HTTP API until Ctrl-C. With --harvest-owner, owners are also re-harvested in the background every --harvest-every seconds."
    )]
    Serve(ServeArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(
        long = "api-listen",
        env = "GH_HARVEST_API_LISTEN",
        value_name = "ADDR",
        default_value = "127.0.0.1:8083",
        help = "REST API listen address (host:port)"
    )]
    pub api_listen: std::net::SocketAddr,

    #[arg(
        long = "harvest-owner",
        value_name = "NAME",
        env = "GH_HARVEST_OWNERS",
        value_delimiter = ',',
        help = "Owner to re-harvest periodically (repeatable)"
    )]
    pub harvest_owners: Vec<String>,

    #[arg(
        long = "harvest-every",
        env = "GH_HARVEST_EVERY",
        value_name = "SECS",
        default_value_t = 86_400u64,
        help = "Seconds between background harvests"
    )]
    pub harvest_every: u64,
}
