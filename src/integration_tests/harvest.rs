//! End-to-end harvests against an in-process fake of the GitHub REST API,
//! through the real blocking client, SQLite storage and the read API.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use url::Url;

use crate::cli::Command;
use crate::commands::CommandRunner;
use crate::context::Context;
use crate::github::GithubClient;
use crate::harvest::{HarvestReport, Harvester};
use crate::query::RepositoryView;
use crate::storage::{SqliteStorage, StorageRead};
use crate::types::HarvestError;

const ACME_PAGES: [usize; 2] = [100, 37];

struct FakeGithub {
    requests: AtomicUsize,
    stars: AtomicU64,
    token: Option<String>,
}

impl FakeGithub {
    fn new(token: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            requests: AtomicUsize::new(0),
            stars: AtomicU64::new(5),
            token: token.map(str::to_string),
        })
    }

    fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

async fn list_repos(
    State(fake): State<Arc<FakeGithub>>,
    Path(owner): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    fake.requests.fetch_add(1, Ordering::SeqCst);

    if let Some(expected) = &fake.token {
        let sent = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if sent != format!("Bearer {expected}") {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"message": "Bad credentials"})),
            )
                .into_response();
        }
    }
    assert_eq!(params.get("per_page").map(String::as_str), Some("100"));
    let page: usize = params["page"].parse().unwrap();

    match owner.as_str() {
        "acme" => {
            let index = page - 1;
            let size = ACME_PAGES.get(index).copied().unwrap_or(0);
            let offset: usize = ACME_PAGES.iter().take(index).sum();
            let stars = fake.stars.load(Ordering::SeqCst);
            let items: Vec<Value> = (0..size)
                .map(|i| repo_json((offset + i + 1) as u64, stars))
                .collect();
            Json(items).into_response()
        }
        "flaky" => (
            StatusCode::BAD_GATEWAY,
            Json(json!({"message": "Server Error"})),
        )
            .into_response(),
        _ => (StatusCode::NOT_FOUND, Json(json!({"message": "Not Found"}))).into_response(),
    }
}

fn repo_json(id: u64, stars: u64) -> Value {
    let description = (id % 2 == 1).then_some("tooling");
    let language = (id % 5 != 0).then_some("Rust");
    json!({
        "id": id,
        "name": format!("repo-{id}"),
        "full_name": format!("acme/repo-{id}"),
        "description": description,
        "html_url": format!("https://github.com/acme/repo-{id}"),
        "stargazers_count": stars,
        "forks_count": id % 3,
        "language": language,
        "updated_at": "2024-05-01T10:00:00Z"
    })
}

/// Serves the fake under `/api/v3` so base URLs with a path are exercised.
async fn spawn_fake(fake: Arc<FakeGithub>) -> Url {
    let app = Router::new()
        .route("/api/v3/users/:owner/repos", get(list_repos))
        .with_state(fake);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Url::parse(&format!("http://{addr}/api/v3")).unwrap()
}

fn temp_db() -> (TempDir, SqliteStorage) {
    let dir = tempfile::tempdir().unwrap();
    let storage = SqliteStorage::new(dir.path().join("gh-harvest.sqlite"));
    storage.init().unwrap();
    (dir, storage)
}

// The blocking client must live and die off the async runtime.
async fn harvest(
    base: Url,
    token: Option<&'static str>,
    storage: SqliteStorage,
    owner: &'static str,
) -> Result<HarvestReport, HarvestError> {
    tokio::task::spawn_blocking(move || {
        let client = GithubClient::new(base, token, Duration::from_secs(5)).unwrap();
        Harvester::new(client, storage).harvest(owner)
    })
    .await
    .unwrap()
}

async fn api_get(storage: SqliteStorage, uri: &str) -> (StatusCode, Value) {
    let response = crate::rest::router(storage)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn harvest_walks_every_page_and_serves_the_rows() {
    let fake = FakeGithub::new(None);
    let base = spawn_fake(fake.clone()).await;
    let (_dir, storage) = temp_db();

    let report = harvest(base, None, storage.clone(), "acme").await.unwrap();

    assert_eq!(fake.requests(), 3);
    assert_eq!(report.pages, 2);
    assert_eq!(report.written, 137);
    assert_eq!(report.skipped, 0);

    let (status, body) = api_get(storage.clone(), "/repositories?owner=acme").await;
    assert_eq!(status, StatusCode::OK);
    let mut repos: Vec<RepositoryView> = serde_json::from_value(body).unwrap();
    assert_eq!(repos.len(), 137);
    repos.sort_by_key(|r| r.id);
    assert_eq!(repos[0].url, "https://github.com/acme/repo-1");
    assert_eq!(repos[0].description.as_deref(), Some("tooling"));
    assert_eq!(repos[1].description, None);
    assert_eq!(repos[4].language, None);

    let (status, body) = api_get(storage.clone(), "/repositories/137").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["url"], "https://github.com/acme/repo-137");

    let (status, body) = api_get(storage, "/owners").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["acme"]));
}

#[tokio::test]
async fn reharvest_through_context_updates_rows_in_place() {
    let fake = FakeGithub::new(None);
    let base = spawn_fake(fake.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = Context {
        data_dir: dir.path().to_path_buf(),
        api_url: base,
        github_token: None,
        request_timeout: Duration::from_secs(5),
        log_file: None,
        reset: false,
    };
    let storage = SqliteStorage::new(ctx.db_path());
    storage.init().unwrap();

    let run = |ctx: Context, owners: &[&str]| {
        let owners: Vec<String> = owners.iter().map(|o| o.to_string()).collect();
        tokio::task::spawn_blocking(move || Command::Harvest { owners }.run(&ctx))
    };

    run(ctx.clone(), &["acme"]).await.unwrap().unwrap();
    let first = storage.load_repository(1).unwrap().unwrap();
    assert_eq!(first.stars, 5);

    fake.stars.store(9, Ordering::SeqCst);
    // Padded and blank entries as produced by `--owner " acme, "`.
    run(ctx, &[" acme", ""]).await.unwrap().unwrap();

    let rows = storage.list_repositories(&[]).unwrap();
    assert_eq!(rows.len(), 137);
    let second = storage.load_repository(1).unwrap().unwrap();
    assert_eq!(second.stars, 9);
    assert!(second.collected_at > first.collected_at);
    assert_eq!(fake.requests(), 6);
}

#[tokio::test]
async fn unknown_owner_stops_after_first_request_and_writes_nothing() {
    let fake = FakeGithub::new(None);
    let base = spawn_fake(fake.clone()).await;
    let (_dir, storage) = temp_db();

    let err = harvest(base, None, storage.clone(), "ghost").await.unwrap_err();

    match err {
        HarvestError::NotFound { resource, page } => {
            assert_eq!(resource, "api/v3/users/ghost/repos");
            assert_eq!(page, 1);
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(fake.requests(), 1);
    assert!(storage.list_repositories(&[]).unwrap().is_empty());

    let (status, body) = api_get(storage, "/owners").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn bearer_token_is_sent_and_rejections_are_auth_errors() {
    let fake = FakeGithub::new(Some("s3cret"));
    let base = spawn_fake(fake.clone()).await;
    let (_dir, storage) = temp_db();

    let err = harvest(base.clone(), Some("wrong"), storage.clone(), "acme")
        .await
        .unwrap_err();
    assert!(matches!(err, HarvestError::Auth { status: 401, page: 1 }));
    assert!(storage.list_repositories(&[]).unwrap().is_empty());

    let report = harvest(base, Some("s3cret"), storage, "acme").await.unwrap();
    assert_eq!(report.written, 137);
}

#[tokio::test]
async fn upstream_server_error_is_reported_with_status_and_message() {
    let fake = FakeGithub::new(None);
    let base = spawn_fake(fake.clone()).await;
    let (_dir, storage) = temp_db();

    let err = harvest(base, None, storage, "flaky").await.unwrap_err();

    match err {
        HarvestError::TransientNetwork {
            page,
            status,
            reason,
        } => {
            assert_eq!(page, 1);
            assert_eq!(status, Some(502));
            assert_eq!(reason, "Server Error");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_api_is_a_transient_network_error() {
    let (_dir, storage) = temp_db();
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let base = Url::parse(&format!("http://{addr}")).unwrap();

    let err = harvest(base, None, storage, "acme").await.unwrap_err();
    assert!(matches!(
        err,
        HarvestError::TransientNetwork { page: 1, status: None, .. }
    ));
}
