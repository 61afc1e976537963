//! Integration tests for the sync runner against mocked endpoints.
//!
//! These tests cover the full lifecycle driving: create on first apply,
//! refresh on an unchanged second apply, recreate after external
//! deletion, update on spec change, destroy, and failure isolation.

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use valosync::config::{Manifest, ProjectSpec};
use valosync::runner::SyncRunner;
use valosync::state::{LocalStateStore, ResourcePhase, StateStore};
use valosync::valohai::{ApiCredentials, ValohaiClient};

fn client(server: &MockServer) -> ValohaiClient {
    ValohaiClient::new(ApiCredentials::new("test-token"))
        .expect("client should build")
        .with_base_url(&server.uri())
}

fn manifest_with_project(description: Option<&str>) -> Manifest {
    Manifest {
        projects: vec![ProjectSpec {
            name: String::from("demo"),
            owner: String::from("acme"),
            description: description.map(String::from),
            template_url: None,
            default_notifications: None,
        }],
        ..Manifest::default()
    }
}

fn project_record() -> serde_json::Value {
    json!({
        "id": "p-1",
        "name": "demo",
        "owner": {"id": 1, "username": "acme"},
        "url": "https://app.valohai.com/api/v0/projects/p-1/"
    })
}

#[tokio::test]
async fn test_apply_creates_then_leaves_unchanged() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/projects/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(project_record()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects/p-1/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(project_record()))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().expect("temp dir");
    let state_store = LocalStateStore::with_base_dir(temp.path());
    let manifest = manifest_with_project(None);
    let client = client(&server);
    let runner = SyncRunner::new(&manifest, &client, &state_store);

    let first = runner.apply().await.expect("first apply failed");
    assert_eq!(first.created, 1);
    assert!(first.success());

    let second = runner.apply().await.expect("second apply failed");
    assert_eq!(second.created, 0);
    assert_eq!(second.unchanged, 1);

    let state = state_store
        .load()
        .await
        .expect("load failed")
        .expect("state should exist");
    let entry = state.get("project/demo").expect("entry should exist");
    assert_eq!(entry.remote_id, "p-1");
    assert_eq!(entry.phase, ResourcePhase::Present);

    server.verify().await;
}

#[tokio::test]
async fn test_apply_recreates_externally_deleted_resource() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/projects/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(project_record()))
        .expect(2)
        .mount(&server)
        .await;
    // The tracked object is gone remotely
    Mock::given(method("GET"))
        .and(path("/projects/p-1/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let temp = TempDir::new().expect("temp dir");
    let state_store = LocalStateStore::with_base_dir(temp.path());
    let manifest = manifest_with_project(None);
    let client = client(&server);
    let runner = SyncRunner::new(&manifest, &client, &state_store);

    let first = runner.apply().await.expect("first apply failed");
    assert_eq!(first.created, 1);

    let second = runner.apply().await.expect("second apply failed");
    assert_eq!(second.created, 1);
    assert_eq!(second.unchanged, 0);

    server.verify().await;
}

#[tokio::test]
async fn test_apply_updates_on_spec_change() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/projects/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(project_record()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects/p-1/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(project_record()))
        .expect(1)
        .mount(&server)
        .await;

    let mut updated_record = project_record();
    updated_record["description"] = json!("pipelines");
    Mock::given(method("PUT"))
        .and(path("/projects/p-1/"))
        .and(body_json(json!({"name": "demo", "description": "pipelines"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(updated_record))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().expect("temp dir");
    let state_store = LocalStateStore::with_base_dir(temp.path());
    let client = client(&server);

    let original = manifest_with_project(None);
    let runner = SyncRunner::new(&original, &client, &state_store);
    runner.apply().await.expect("first apply failed");

    let changed = manifest_with_project(Some("pipelines"));
    let runner = SyncRunner::new(&changed, &client, &state_store);
    let report = runner.apply().await.expect("second apply failed");

    assert_eq!(report.updated, 1);
    assert_eq!(report.created, 0);

    server.verify().await;
}

#[tokio::test]
async fn test_destroy_deletes_tracked_resources() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/projects/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(project_record()))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/projects/p-1/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().expect("temp dir");
    let state_store = LocalStateStore::with_base_dir(temp.path());
    let manifest = manifest_with_project(None);
    let client = client(&server);
    let runner = SyncRunner::new(&manifest, &client, &state_store);

    runner.apply().await.expect("apply failed");
    let report = runner.destroy().await.expect("destroy failed");

    assert_eq!(report.removed, 1);
    assert!(report.success());

    // State is cleared once nothing is tracked
    assert!(
        state_store
            .load()
            .await
            .expect("load failed")
            .is_none()
    );

    server.verify().await;
}

#[tokio::test]
async fn test_one_failure_does_not_abort_the_run() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/projects/"))
        .and(body_json(json!({"name": "demo", "owner": "acme"})))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "detail": "invalid owner"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/projects/"))
        .and(body_json(json!({"name": "other", "owner": "acme"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "p-2",
            "name": "other",
            "owner": {"id": 1, "username": "acme"}
        })))
        .mount(&server)
        .await;

    let mut manifest = manifest_with_project(None);
    manifest.projects.push(ProjectSpec {
        name: String::from("other"),
        owner: String::from("acme"),
        description: None,
        template_url: None,
        default_notifications: None,
    });

    let temp = TempDir::new().expect("temp dir");
    let state_store = LocalStateStore::with_base_dir(temp.path());
    let client = client(&server);
    let runner = SyncRunner::new(&manifest, &client, &state_store);

    let report = runner.apply().await.expect("apply should not abort");
    assert_eq!(report.created, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("invalid owner"));

    // The failed resource must not be recorded
    let state = state_store
        .load()
        .await
        .expect("load failed")
        .expect("state should exist");
    assert!(state.get("project/demo").is_none());
    assert!(state.get("project/other").is_some());
}

#[tokio::test]
async fn test_apply_refuses_locked_state() {
    let server = MockServer::start().await;

    let temp = TempDir::new().expect("temp dir");
    let state_store = LocalStateStore::with_base_dir(temp.path());
    let _lock = state_store
        .acquire_lock("another-process")
        .await
        .expect("lock failed");

    let manifest = manifest_with_project(None);
    let client = client(&server);
    let runner = SyncRunner::new(&manifest, &client, &state_store);

    let err = runner.apply().await.unwrap_err();
    assert!(err.to_string().contains("another-process"));
}
