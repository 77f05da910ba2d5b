use std::io::Write;

use anyhow::{ensure, Context, Result};

use crate::context;
use crate::harvest::{clean_owners, HarvestReport, Harvester};
use crate::storage::SqliteStorage;

pub fn run(ctx: &context::Context, owners: &[String]) -> Result<()> {
    let owners = clean_owners(owners);
    ensure!(!owners.is_empty(), "no owner to harvest (every --owner was blank)");

    let client = ctx.github_client()?;
    let storage = SqliteStorage::new(ctx.db_path());
    let harvester = Harvester::new(client, storage);

    let mut stdout = std::io::stdout().lock();
    for owner in &owners {
        let report = harvester
            .harvest(owner)
            .with_context(|| format!("harvesting repositories of '{}'", owner))?;
        write_report(&mut stdout, &report)?;
    }
    Ok(())
}

fn write_report<W: Write>(out: &mut W, report: &HarvestReport) -> std::io::Result<()> {
    writeln!(
        out,
        "{}: {} fetched over {} pages, {} written, {} skipped ({:.1?})",
        report.owner, report.fetched, report.pages, report.written, report.skipped, report.elapsed
    )
}
