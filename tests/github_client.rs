//! Live GitHub client against a local mock of the release API.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use clap::Parser;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use kodegen_release_pipeline::cli::RetryConfig;
use kodegen_release_pipeline::cli::commands::{Core, ReleaseHandler};
use kodegen_release_pipeline::error::{ConfigError, ReleaseError, RemoteError};
use kodegen_release_pipeline::github::{
    AssetFile, GitHubClient, ReleaseClient, ReleaseId, upload_asset_with_retries,
};
use kodegen_release_pipeline::{
    Args, CommandHandler, EnvConfig, ProjectConfig, ReleaseSettings, RunContext,
};

#[derive(Default)]
struct MockState {
    create_status: Option<u16>,
    upload_statuses: VecDeque<u16>,
    created: Vec<Value>,
    uploads: Vec<(String, String, Vec<u8>)>,
    authorization: Vec<String>,
}

type Shared = Arc<Mutex<MockState>>;

async fn create_release(
    State(state): State<Shared>,
    Path((_owner, _repo)): Path<(String, String)>,
    headers: axum::http::HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut state = state.lock().unwrap();
    if let Some(auth) = headers.get("authorization") {
        state.authorization.push(auth.to_str().unwrap().to_string());
    }
    state.created.push(body);
    let status = state.create_status.unwrap_or(201);
    (
        StatusCode::from_u16(status).unwrap(),
        Json(json!({ "id": 4242, "html_url": "https://example.invalid/r/4242" })),
    )
}

async fn upload_asset(
    State(state): State<Shared>,
    Path((_owner, _repo, id)): Path<(String, String, String)>,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> (StatusCode, String) {
    let mut state = state.lock().unwrap();
    let name = query.get("name").cloned().unwrap_or_default();
    state.uploads.push((id, name, body.to_vec()));
    let status = state.upload_statuses.pop_front().unwrap_or(201);
    (StatusCode::from_u16(status).unwrap(), "{}".to_string())
}

async fn start_mock(state: Shared) -> String {
    let app = Router::new()
        .route("/repos/{owner}/{repo}/releases", post(create_release))
        .route(
            "/repos/{owner}/{repo}/releases/{id}/assets",
            post(upload_asset),
        )
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base: &str) -> ReleaseClient {
    ReleaseClient::GitHub(
        GitHubClient::with_base_urls("secret-token".to_string(), base, base).unwrap(),
    )
}

fn settings() -> ReleaseSettings {
    ReleaseSettings {
        repository_owner: "acme".to_string(),
        repository: "tool".to_string(),
        name: "tool v1.0.0".to_string(),
        ..Default::default()
    }
}

fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(10),
    }
}

fn artifact(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let nested = dir.path().join("dist").join("archives");
    std::fs::create_dir_all(&nested).unwrap();
    let path = nested.join("tool_v1.0.0_linux.tar.gz");
    std::fs::write(&path, b"archive-bytes").unwrap();
    path
}

#[tokio::test]
async fn create_release_sends_settings_and_notes() {
    let state = Shared::default();
    let base = start_mock(state.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let notes = dir.path().join("NOTES.md");
    std::fs::write(&notes, "## Changes\n- faster").unwrap();

    let settings = ReleaseSettings {
        release_notes_file: Some(notes),
        draft: true,
        generate_release_notes: true,
        ..settings()
    };

    let id = client(&base)
        .create_release("v1.0.0", "abc123", &settings)
        .await
        .unwrap();
    assert_eq!(id, ReleaseId::Live(4242));

    let state = state.lock().unwrap();
    let body = &state.created[0];
    assert_eq!(body["tag_name"], "v1.0.0");
    assert_eq!(body["target_commitish"], "abc123");
    assert_eq!(body["name"], "tool v1.0.0");
    assert_eq!(body["body"], "## Changes\n- faster");
    assert_eq!(body["draft"], true);
    assert_eq!(body["prerelease"], false);
    assert_eq!(body["generate_release_notes"], true);
    assert_eq!(state.authorization, vec!["Bearer secret-token"]);
}

#[tokio::test]
async fn create_release_with_unexpected_status_is_fatal_and_not_retried() {
    let state = Shared::default();
    state.lock().unwrap().create_status = Some(503);
    let base = start_mock(state.clone()).await;

    let err = client(&base)
        .create_release("v1.0.0", "", &settings())
        .await
        .unwrap_err();

    assert!(!err.is_temporary());
    assert!(matches!(
        err,
        ReleaseError::Remote(RemoteError::UnexpectedStatus { status: 503, .. })
    ));
    assert_eq!(state.lock().unwrap().created.len(), 1);
}

#[tokio::test]
async fn unreadable_release_notes_fail_before_any_request() {
    let state = Shared::default();
    let base = start_mock(state.clone()).await;
    let settings = ReleaseSettings {
        release_notes_file: Some("/definitely/not/here.md".into()),
        ..settings()
    };

    let err = client(&base)
        .create_release("v1.0.0", "", &settings)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ReleaseError::Config(ConfigError::ReleaseNotes { .. })
    ));
    assert!(state.lock().unwrap().created.is_empty());
}

#[tokio::test]
async fn upload_retries_temporary_failures_with_fresh_file() {
    let state = Shared::default();
    state.lock().unwrap().upload_statuses = VecDeque::from([502, 500]);
    let base = start_mock(state.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let path = artifact(&dir);

    upload_asset_with_retries(
        &client(&base),
        &settings(),
        ReleaseId::Live(4242),
        &path,
        &fast_retry(5),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let state = state.lock().unwrap();
    assert_eq!(state.uploads.len(), 3);
    for (id, name, body) in &state.uploads {
        assert_eq!(id, "4242");
        assert_eq!(name, "tool_v1.0.0_linux.tar.gz");
        assert_eq!(body, b"archive-bytes");
    }
}

#[tokio::test]
async fn upload_stops_on_deny_listed_status() {
    for status in [400, 422] {
        let state = Shared::default();
        state.lock().unwrap().upload_statuses = VecDeque::from([status]);
        let base = start_mock(state.clone()).await;
        let dir = tempfile::tempdir().unwrap();

        let err = upload_asset_with_retries(
            &client(&base),
            &settings(),
            ReleaseId::Live(1),
            &artifact(&dir),
            &fast_retry(5),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            ReleaseError::Remote(RemoteError::UnexpectedStatus { status: s, .. }) if s == status
        ));
        assert_eq!(state.lock().unwrap().uploads.len(), 1);
    }
}

#[tokio::test]
async fn upload_gives_up_after_max_attempts() {
    let state = Shared::default();
    state.lock().unwrap().upload_statuses = VecDeque::from(vec![401; 10]);
    let base = start_mock(state.clone()).await;
    let dir = tempfile::tempdir().unwrap();

    let err = upload_asset_with_retries(
        &client(&base),
        &settings(),
        ReleaseId::Live(1),
        &artifact(&dir),
        &fast_retry(3),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    match err {
        ReleaseError::Remote(RemoteError::RetriesExhausted { attempts, last, .. }) => {
            assert_eq!(attempts, 3);
            assert!(last.is_temporary());
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(state.lock().unwrap().uploads.len(), 3);
}

#[tokio::test]
async fn live_client_rejects_dry_run_ids_and_missing_files() {
    let state = Shared::default();
    let base = start_mock(state.clone()).await;
    let client = client(&base);
    let dir = tempfile::tempdir().unwrap();
    let asset = AssetFile::open(&artifact(&dir)).await.unwrap();

    let err = client
        .upload_asset(&settings(), Some(asset), ReleaseId::DryRun(4242))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ReleaseError::Remote(RemoteError::ReleaseIdMismatch { .. })
    ));

    let err = client
        .upload_asset(&settings(), None, ReleaseId::Live(4242))
        .await
        .unwrap_err();
    assert!(matches!(err, ReleaseError::Remote(RemoteError::MissingAsset)));
    assert!(state.lock().unwrap().uploads.is_empty());
}

#[tokio::test]
async fn unreachable_service_is_temporary() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let dir = tempfile::tempdir().unwrap();
    let asset = AssetFile::open(&artifact(&dir)).await.unwrap();
    let err = client(&base)
        .upload_asset(&settings(), Some(asset), ReleaseId::Live(1))
        .await
        .unwrap_err();
    assert!(err.is_temporary());
}

#[tokio::test]
async fn release_phase_creates_and_uploads_every_archive() {
    let state = Shared::default();
    state.lock().unwrap().upload_statuses = VecDeque::from([502]);
    let base = start_mock(state.clone()).await;
    let dir = tempfile::tempdir().unwrap();

    let project = ProjectConfig::parse(
        r#"
project = "tool"

[release]
repository_owner = "acme"
repository = "tool"
name = "tool {tag}"
"#,
        dir.path().to_path_buf(),
    )
    .unwrap();
    let dist = dir.path().join("dist");
    let args = Args::try_parse_from([
        "kodegen_release_pipeline",
        "release",
        "--tag",
        "v1.0.0",
        "--commitish",
        "abc123",
        "--dist",
        dist.to_str().unwrap(),
        "--quiet",
    ])
    .unwrap();
    let env = EnvConfig::from_pairs([(RetryConfig::DELAY_VAR, "5")]);
    let core = Arc::new(Core::new(&args, project, env));

    std::fs::create_dir_all(core.archives_dir()).unwrap();
    for build in ["linux", "darwin"] {
        std::fs::write(
            core.archives_dir().join(core.archive_name(build)),
            format!("{build}-bytes"),
        )
        .unwrap();
    }

    let mut handler = ReleaseHandler::new(core).with_client(client(&base));
    handler.init().unwrap();
    handler.exec(&RunContext::new(), &[]).await.unwrap();

    let state = state.lock().unwrap();
    assert_eq!(state.created.len(), 1);
    assert_eq!(state.created[0]["tag_name"], "v1.0.0");
    assert_eq!(state.created[0]["target_commitish"], "abc123");
    assert_eq!(state.created[0]["name"], "tool v1.0.0");

    let uploads: Vec<(&str, &str, &[u8])> = state
        .uploads
        .iter()
        .map(|(id, name, body)| (id.as_str(), name.as_str(), body.as_slice()))
        .collect();
    assert_eq!(
        uploads,
        vec![
            ("4242", "tool_v1.0.0_darwin.tar.gz", &b"darwin-bytes"[..]),
            ("4242", "tool_v1.0.0_darwin.tar.gz", &b"darwin-bytes"[..]),
            ("4242", "tool_v1.0.0_linux.tar.gz", &b"linux-bytes"[..]),
        ]
    );
}
