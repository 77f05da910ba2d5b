mod wiring;

use crate::commands::CommandRunner;
use crate::{cli, context, harvest, rest, scheduler, storage};
use anyhow::{Context as AnyhowContext, Result};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct App {
    pub ctx: context::Context,
    pub storage: storage::SqliteStorage,
}

impl App {
    pub fn from_cli() -> Result<(Self, cli::Cli)> {
        let cli = crate::cli::parse();
        let ctx = context::Context::from_cli(&cli)?;

        crate::tracing::init(ctx.log_file.as_deref());
        log::info!("🚀 Starting gh-harvest");
        log::info!("🔗 GitHub API: {}", ctx.api_url);
        log::info!(
            "🔐 Auth: {}",
            if ctx.github_token.is_some() { "bearer token" } else { "anonymous" }
        );
        log::info!("📂 Data dir: {}", ctx.data_dir.display());

        wiring::init_data_dir(&ctx).context("initializing data dir")?;
        let storage = wiring::init_storage(&ctx)?;

        Ok((Self { ctx, storage }, cli))
    }
}

pub async fn run_daemon(app: App, args: cli::ServeArgs) -> Result<()> {
    log::info!("🌐 REST API: http://{}", args.api_listen);
    if let Some(path) = app.ctx.log_file.as_deref() {
        log::info!("📝 Log file: {}", path.display());
    }

    let shutdown = CancellationToken::new();

    // REST
    let api_addr = args.api_listen;
    let rest_storage = app.storage.clone();
    let rest_shutdown = shutdown.clone();
    let mut rest_handle = tokio::spawn(async move {
        rest::serve(api_addr, rest_storage, rest_shutdown)
            .await
            .with_context(|| format!("REST server on {api_addr}"))
    });

    // Periodic harvests
    let mut scheduler_handle = spawn_scheduler(&app.ctx, &args, shutdown.clone());

    wait_for_shutdown(&shutdown, &mut rest_handle, &mut scheduler_handle).await
}

fn spawn_scheduler(
    ctx: &context::Context,
    args: &cli::ServeArgs,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    let owners = harvest::clean_owners(&args.harvest_owners);
    if owners.is_empty() {
        log::info!("⏸️ No --harvest-owner given, background harvests disabled");
        return tokio::spawn(async move { shutdown.cancelled().await });
    }

    let every = Duration::from_secs(args.harvest_every.max(1));
    let job = scheduler::github_job(ctx.clone());
    let scheduler = scheduler::Scheduler::new(owners, every, job);
    tokio::spawn(scheduler.run(shutdown))
}

async fn wait_for_shutdown(
    shutdown: &CancellationToken,
    rest_task: &mut JoinHandle<Result<()>>,
    scheduler_task: &mut JoinHandle<()>,
) -> Result<()> {
    let mut fatal_error: Option<anyhow::Error> = None;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => log::info!("🧨 Ctrl-C received, shutting down"),
        res = &mut *rest_task => {
            log::error!("REST task exited unexpectedly");
            fatal_error = Some(match res {
                Ok(Ok(())) => anyhow::anyhow!("REST server stopped before shutdown"),
                Ok(Err(e)) => e,
                Err(e) => anyhow::Error::new(e).context("REST task panicked"),
            });
        }
        res = &mut *scheduler_task => {
            log::error!("Scheduler task exited unexpectedly");
            fatal_error = Some(match res {
                Ok(()) => anyhow::anyhow!("scheduler stopped before shutdown"),
                Err(e) => anyhow::Error::new(e).context("scheduler task panicked"),
            });
        }
    }

    shutdown.cancel();

    // A finished JoinHandle must not be polled again.
    if !rest_task.is_finished() {
        match rest_task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                log::error!("REST server error: {:#}", e);
                fatal_error.get_or_insert(e);
            }
            Err(e) => {
                log::error!("REST task error: {}", e);
                fatal_error.get_or_insert(e.into());
            }
        }
    }
    if !scheduler_task.is_finished() {
        if let Err(e) = scheduler_task.await {
            log::error!("Scheduler task error: {}", e);
            fatal_error.get_or_insert(e.into());
        }
    }

    if let Some(e) = fatal_error {
        log::error!("❌ Shutdown after failure: {:#}", e);
        return Err(e);
    }

    log::info!("✅ Shutdown complete");
    Ok(())
}

pub async fn run() -> Result<()> {
    let (app, cli) = App::from_cli()?;

    match cli.cmd {
        cli::Command::Serve(args) => run_daemon(app, args).await,
        cmd => {
            // one-shot command mode
            let ctx = app.ctx.clone();
            tokio::task::spawn_blocking(move || cmd.run(&ctx))
                .await
                .context("command task panicked")?
        }
    }
}
