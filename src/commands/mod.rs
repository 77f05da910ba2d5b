use anyhow::bail;

use crate::cli::Command;
use crate::context;

pub mod harvest;
pub mod query;

pub trait CommandRunner {
    fn run(&self, ctx: &context::Context) -> anyhow::Result<()>;
}

/// One-shot commands. They block on network and disk, so callers on the
/// async runtime dispatch them through `spawn_blocking`.
impl CommandRunner for Command {
    fn run(&self, ctx: &context::Context) -> anyhow::Result<()> {
        match self {
            Command::Harvest { owners } => harvest::run(ctx, owners),
            Command::List { owners, json } => query::list(ctx, owners, *json),
            Command::Export { owners, output } => query::export(ctx, owners, output),
            Command::Owners => query::owners(ctx),
            Command::Stats { owners, top, json } => query::stats(ctx, owners, *top, *json),
            Command::Serve(_) => bail!("serve runs as a daemon, not as a one-shot command"),
        }
    }
}
