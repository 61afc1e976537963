//! Integration tests for the resource synchronizers using wiremock.
//!
//! These tests drive the client and the per-kind synchronizers against
//! mocked endpoints, pinning the wire format (payload shapes, token
//! header) and the status-code policies.

use serde_json::json;
use std::collections::BTreeMap;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use valosync::config::{
    AccessMode, CredentialType, ProjectSpec, RegistryCredentialSpec, StoreSpec, StoreType,
};
use valosync::sync::{
    AttrValue, ProjectSync, ReadOutcome, RegistryCredentialSync, ResourceSync, StoreSync,
};
use valosync::valohai::{ApiCredentials, ValohaiClient};

const TOKEN: &str = "test-token";

fn client(server: &MockServer) -> ValohaiClient {
    ValohaiClient::new(ApiCredentials::new(TOKEN))
        .expect("client should build")
        .with_base_url(&server.uri())
}

fn project_spec() -> ProjectSpec {
    ProjectSpec {
        name: String::from("demo"),
        owner: String::from("acme"),
        description: None,
        template_url: None,
        default_notifications: None,
    }
}

fn store_spec() -> StoreSpec {
    StoreSpec {
        name: String::from("artifacts"),
        store_type: StoreType::S3,
        access_mode: None,
        allow_read: None,
        allow_write: None,
        allow_uri_download: None,
        configuration: BTreeMap::new(),
        owner_id: None,
        project: None,
        paths: BTreeMap::new(),
        teams: Vec::new(),
    }
}

fn docker_spec() -> RegistryCredentialSpec {
    RegistryCredentialSpec {
        name: String::from("ghcr"),
        credential_type: CredentialType::Docker,
        image_pattern: String::from("ghcr.io/acme/*"),
        owner: None,
        configuration: BTreeMap::from([
            (String::from("username"), String::from("u")),
            (String::from("password"), String::from("p")),
        ]),
    }
}

/// Create with only required fields set must send exactly those fields,
/// with the token-style authorization header.
#[tokio::test]
async fn test_create_project_sends_only_required_fields() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/projects/"))
        .and(header("Authorization", "Token test-token"))
        .and(body_json(json!({"name": "demo", "owner": "acme"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "p-1",
            "name": "demo",
            "owner": {"id": 1, "username": "acme"},
            "url": "https://app.valohai.com/api/v0/projects/p-1/"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let sync = ProjectSync::new(&client);
    let reconciled = sync.create(&project_spec()).await.expect("create failed");

    assert_eq!(reconciled.id, "p-1");
    assert_eq!(
        reconciled.attr("owner"),
        Some(&AttrValue::Str(String::from("acme")))
    );
}

/// A create answered with anything but 201 is a hard failure carrying
/// the extracted message.
#[tokio::test]
async fn test_create_project_non_201_is_error_with_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/projects/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "detail": "project name already in use",
            "code": "conflict"
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let sync = ProjectSync::new(&client);
    let err = sync.create(&project_spec()).await.unwrap_err();

    let message = err.to_string();
    assert!(message.contains("400"), "missing status in: {message}");
    assert!(message.contains("project name already in use"));
    assert!(message.contains("conflict"));
}

/// A 404 on Read is a defined absence, not an error.
#[tokio::test]
async fn test_read_404_yields_absent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects/p-gone/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client(&server);
    let sync = ProjectSync::new(&client);
    let outcome = sync.read("p-gone", None).await.expect("read failed");

    assert!(matches!(outcome, ReadOutcome::Absent));
}

/// Delete succeeds for 200, 204 and 404 and fails for anything else.
#[tokio::test]
async fn test_delete_status_code_policy() {
    let server = MockServer::start().await;

    for (id, status) in [("s-200", 200), ("s-204", 204), ("s-404", 404)] {
        Mock::given(method("DELETE"))
            .and(path(format!("/stores/{id}/")))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
    }
    Mock::given(method("DELETE"))
        .and(path("/stores/s-500/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = client(&server);
    let sync = StoreSync::new(&client);

    for id in ["s-200", "s-204", "s-404"] {
        assert!(sync.delete(id).await.is_ok(), "delete {id} should succeed");
    }

    let err = sync.delete("s-500").await.unwrap_err();
    assert!(err.to_string().contains("500"));
}

/// Update success is exactly HTTP 200; a 204 is a terminal error.
#[tokio::test]
async fn test_update_requires_200() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/teams/t-1/"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = client(&server);
    let sync = valosync::sync::TeamSync::new(&client);
    let spec = valosync::config::TeamSpec {
        name: String::from("research"),
        organization: 42,
    };

    let err = sync.update("t-1", &spec).await.unwrap_err();
    assert!(err.to_string().contains("204"));
}

/// Applying an update whose desired state matches the remote echo leaves
/// every attribute value unchanged.
#[tokio::test]
async fn test_update_roundtrip_is_idempotent() {
    let server = MockServer::start().await;

    let record = json!({
        "id": "p-1",
        "name": "demo",
        "owner": {"id": 1, "username": "acme"},
        "url": "https://app.valohai.com/api/v0/projects/p-1/"
    });

    Mock::given(method("GET"))
        .and(path("/projects/p-1/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&record))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/projects/p-1/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&record))
        .mount(&server)
        .await;

    let client = client(&server);
    let sync = ProjectSync::new(&client);
    let spec = project_spec();

    let before = match sync.read("p-1", Some(&spec)).await.expect("read failed") {
        ReadOutcome::Present(reconciled) => reconciled,
        ReadOutcome::Absent => panic!("resource should exist"),
    };
    let after = sync.update("p-1", &spec).await.expect("update failed");

    assert_eq!(before.id, after.id);
    assert_eq!(before.attributes, after.attributes);
}

/// Store access-mode exclusivity fails before any network call.
#[tokio::test]
async fn test_store_exclusivity_blocks_network() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/stores/"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let client = client(&server);
    let sync = StoreSync::new(&client);

    let mut spec = store_spec();
    spec.access_mode = Some(AccessMode::OwnerOrganization);
    spec.teams = vec![String::from("t-1")];

    let err = sync.create(&spec).await.unwrap_err();
    assert!(err.to_string().contains("owner_organization"));

    server.verify().await;
}

/// Registry-credential validation fails before any network call, naming
/// the missing key.
#[tokio::test]
async fn test_registry_credentials_missing_key_blocks_network() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/registry-credentials/"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let client = client(&server);
    let sync = RegistryCredentialSync::new(&client);

    let mut spec = docker_spec();
    spec.configuration.remove("password");

    let err = sync.create(&spec).await.unwrap_err();
    assert!(err.to_string().contains("configuration.password"));

    server.verify().await;
}

/// The normalized configuration gains `version = "1"` and the local label
/// is never sent.
#[tokio::test]
async fn test_registry_credentials_payload_is_normalized() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/registry-credentials/"))
        .and(body_json(json!({
            "type": "docker",
            "image_pattern": "ghcr.io/acme/*",
            "configuration": {
                "username": "u",
                "password": "p",
                "version": "1"
            }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "rc-1",
            "type": "docker",
            "image_pattern": "ghcr.io/acme/*",
            "owner": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let sync = RegistryCredentialSync::new(&client);
    let reconciled = sync.create(&docker_spec()).await.expect("create failed");

    assert_eq!(reconciled.id, "rc-1");
    let configuration = match reconciled.attr("configuration") {
        Some(AttrValue::Map(map)) => map.clone(),
        other => panic!("unexpected configuration attribute: {other:?}"),
    };
    assert_eq!(configuration.get("version").map(String::as_str), Some("1"));
}

/// A store's `project` field normalizes identically whether the API
/// returns a bare identifier or an embedded object.
#[tokio::test]
async fn test_polymorphic_project_field_normalizes() {
    let server = MockServer::start().await;

    let base = json!({
        "name": "artifacts",
        "type": "s3",
        "access_mode": "single_project",
        "allow_read": true,
        "allow_write": true,
        "allow_uri_download": false,
        "configuration": {},
        "owner": 1,
        "paths": {},
        "teams": [],
        "url": "https://app.valohai.com/api/v0/stores/s-1/"
    });

    let mut bare = base.clone();
    bare["id"] = json!("s-1");
    bare["project"] = json!("abc");
    Mock::given(method("GET"))
        .and(path("/stores/s-1/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&bare))
        .mount(&server)
        .await;

    let mut embedded = base;
    embedded["id"] = json!("s-2");
    embedded["project"] = json!({"id": "abc", "name": "demo"});
    Mock::given(method("GET"))
        .and(path("/stores/s-2/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&embedded))
        .mount(&server)
        .await;

    let client = client(&server);
    let sync = StoreSync::new(&client);

    let mut projects = Vec::new();
    for id in ["s-1", "s-2"] {
        match sync.read(id, None).await.expect("read failed") {
            ReadOutcome::Present(reconciled) => {
                projects.push(reconciled.attr("project").cloned());
            }
            ReadOutcome::Absent => panic!("store {id} should exist"),
        }
    }

    assert_eq!(projects[0], Some(AttrValue::Str(String::from("abc"))));
    assert_eq!(projects[0], projects[1]);
}

/// Store reconciliation keeps only declared configuration keys and
/// prefers the server's value for each.
#[tokio::test]
async fn test_store_configuration_harmonization() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/stores/"))
        .and(body_partial_json(json!({
            "configuration": {"bucket": "declared-bucket", "region": "eu-west-1"}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "s-1",
            "name": "artifacts",
            "type": "s3",
            "allow_read": true,
            "allow_write": true,
            "allow_uri_download": false,
            "configuration": {
                "bucket": "server-bucket",
                "region": "eu-west-1",
                "multipart_upload_iam_role": "arn:aws:iam::1:role/upload"
            },
            "owner": 1,
            "paths": {},
            "teams": [],
            "url": "https://app.valohai.com/api/v0/stores/s-1/"
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let sync = StoreSync::new(&client);

    let mut spec = store_spec();
    spec.configuration = BTreeMap::from([
        (String::from("bucket"), String::from("declared-bucket")),
        (String::from("region"), String::from("eu-west-1")),
    ]);

    let reconciled = sync.create(&spec).await.expect("create failed");
    let configuration = match reconciled.attr("configuration") {
        Some(AttrValue::Map(map)) => map.clone(),
        other => panic!("unexpected configuration attribute: {other:?}"),
    };

    // server value wins, undeclared server keys are not adopted
    assert_eq!(
        configuration.get("bucket").map(String::as_str),
        Some("server-bucket")
    );
    assert!(!configuration.contains_key("multipart_upload_iam_role"));
}

/// Transport failures surface as errors, not panics.
#[tokio::test]
async fn test_transport_error_is_surfaced() {
    let client = ValohaiClient::new(ApiCredentials::new(TOKEN))
        .expect("client should build")
        .with_base_url("http://127.0.0.1:1");

    let sync = ProjectSync::new(&client);
    let err = sync.read("p-1", None).await.unwrap_err();
    assert!(err.to_string().contains("Transport error"));
}
