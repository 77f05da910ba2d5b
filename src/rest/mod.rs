use std::net::SocketAddr;

use axum::{routing::get, Router};

use crate::storage::StorageRead;

mod handlers;
mod models;

use handlers::{
    get_repository, health, list_owners, list_repositories, not_found, repository_stats,
};

#[derive(Clone)]
pub struct AppState<S: StorageRead + Clone> {
    pub storage: S,
    pub started_at: std::time::SystemTime,
}

pub fn router<S: StorageRead + Clone + Send + Sync + 'static>(storage: S) -> Router {
    let state = AppState {
        storage,
        started_at: std::time::SystemTime::now(),
    };

    Router::new()
        .route("/health", get(health::<S>))
        .route("/repositories", get(list_repositories::<S>))
        .route("/repositories/:id", get(get_repository::<S>))
        .route("/owners", get(list_owners::<S>))
        .route("/stats", get(repository_stats::<S>))
        .fallback(not_found)
        .with_state(state)
}

pub async fn serve<S: StorageRead + Clone + Send + Sync + 'static>(
    addr: SocketAddr,
    storage: S,
    shutdown: tokio_util::sync::CancellationToken,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("🌐 REST service on http://{}", listener.local_addr()?);

    axum::serve(listener, router(storage))
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            log::info!("🛑 REST shutdown requested");
        })
        .await?;
    log::info!("👋 REST server exited");
    Ok(())
}
