use axum::{
    extract::{rejection::PathRejection, Path, RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    query,
    stats::{RepositoryStats, DEFAULT_TOP},
    storage::StorageRead,
    types::PersistenceError,
};

use super::{
    models::{ErrorResponse, HealthResponse, RepositoryFilter},
    AppState,
};

const NO_REPOSITORIES: &str = "no repositories found for the given criteria";
const NO_OWNERS: &str = "no owners found in the database";

pub async fn health<S: StorageRead + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
) -> impl IntoResponse {
    let uptime_secs = state.started_at.elapsed().map(|d| d.as_secs()).unwrap_or(0);
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            uptime_secs,
        }),
    )
}

pub async fn list_repositories<S: StorageRead + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    RawQuery(raw): RawQuery,
) -> Response {
    let filter = match RepositoryFilter::from_query(raw.as_deref()) {
        Ok(filter) => filter,
        Err(message) => return error(StatusCode::BAD_REQUEST, message),
    };

    match query::query_repositories(&state.storage, &filter.owners) {
        Ok(repos) if repos.is_empty() => error(StatusCode::NOT_FOUND, NO_REPOSITORIES),
        Ok(repos) => Json(repos).into_response(),
        Err(err) => storage_failure("list repositories", err),
    }
}

pub async fn get_repository<S: StorageRead + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    id: Result<Path<i64>, PathRejection>,
) -> Response {
    let Ok(Path(id)) = id else {
        return error(StatusCode::BAD_REQUEST, "repository id must be an integer");
    };

    match query::find_repository(&state.storage, id) {
        Ok(Some(repo)) => Json(repo).into_response(),
        Ok(None) => error(StatusCode::NOT_FOUND, format!("repository {id} not found")),
        Err(err) => storage_failure("load repository", err),
    }
}

pub async fn list_owners<S: StorageRead + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
) -> Response {
    match query::list_owners(&state.storage) {
        Ok(owners) if owners.is_empty() => error(StatusCode::NOT_FOUND, NO_OWNERS),
        Ok(owners) => Json(owners).into_response(),
        Err(err) => storage_failure("list owners", err),
    }
}

pub async fn repository_stats<S: StorageRead + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    RawQuery(raw): RawQuery,
) -> Response {
    let filter = match RepositoryFilter::from_query(raw.as_deref()) {
        Ok(filter) => filter,
        Err(message) => return error(StatusCode::BAD_REQUEST, message),
    };

    match query::query_repositories(&state.storage, &filter.owners) {
        Ok(repos) if repos.is_empty() => error(StatusCode::NOT_FOUND, NO_REPOSITORIES),
        Ok(repos) => {
            let top = filter.top.unwrap_or(DEFAULT_TOP);
            Json(RepositoryStats::compute(&repos, top, chrono::Utc::now())).into_response()
        }
        Err(err) => storage_failure("compute stats", err),
    }
}

pub async fn not_found() -> impl IntoResponse {
    error(StatusCode::NOT_FOUND, "endpoint not found")
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}

fn storage_failure(action: &str, err: PersistenceError) -> Response {
    log::error!("Failed to {}: {}", action, err);
    error(StatusCode::INTERNAL_SERVER_ERROR, "storage unavailable")
}
