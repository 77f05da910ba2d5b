use anyhow::{Context, Result};

use crate::{context, storage};

pub fn init_data_dir(ctx: &context::Context) -> Result<()> {
    std::fs::create_dir_all(&ctx.data_dir)?;
    Ok(())
}

pub fn init_storage(ctx: &context::Context) -> Result<storage::SqliteStorage> {
    let sqlite = storage::SqliteStorage::new(ctx.db_path());
    if ctx.reset {
        log::warn!("🧹 Resetting database {}", ctx.db_path().display());
        sqlite.reset_all().context("resetting storage")?;
    }
    sqlite.init().context("initializing storage")?;
    Ok(sqlite)
}
