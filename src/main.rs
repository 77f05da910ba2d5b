mod app;
mod cli;
mod commands;
mod context;
mod github;
mod harvest;
mod query;
mod rest;
mod scheduler;
mod stats;
mod storage;
mod tracing;
mod types;

#[cfg(test)]
mod integration_tests;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    app::run().await
}
