use assert_cmd::Command;
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SCHEMA: &str = r#"
version: 1
tasks:
  - kind: fields
    table: Customers
    fields:
      - { name: city, type: singleLineText }
  - kind: choices
    table: Customers
    field: tier
    choices: [bronze, silver, gold]
"#;

async fn mount_base(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v0/meta/bases/appTest/tables"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tables": [{
                "id": "tblCust",
                "name": "Customers",
                "primaryFieldId": "fldName",
                "fields": [
                    { "id": "fldName", "name": "name", "type": "singleLineText" },
                    {
                        "id": "fldTier",
                        "name": "tier",
                        "type": "singleSelect",
                        "options": { "choices": [
                            { "id": "selB", "name": "bronze", "color": "grayLight2" },
                            { "id": "selS", "name": "silver", "color": "grayLight2" }
                        ]}
                    }
                ]
            }]
        })))
        .mount(server)
        .await;
}

/// Runs the binary off the async runtime so the mock server keeps serving.
async fn basesync(server: &MockServer, args: Vec<String>) -> std::process::Output {
    let api_url = format!("{}/v0/meta/bases", server.uri());
    tokio::task::spawn_blocking(move || {
        Command::cargo_bin("basesync")
            .unwrap()
            .env_remove("BASESYNC_LOG")
            .env("BASESYNC_BASE_ID", "appTest")
            .env("BASESYNC_API_KEY", "key-test")
            .env("BASESYNC_API_URL", api_url)
            .env("BASESYNC_FIELD_DELAY_MS", "0")
            .args(args)
            .output()
            .unwrap()
    })
    .await
    .unwrap()
}

fn schema_file(dir: &TempDir) -> PathBuf {
    let p = dir.path().join("basesync.yaml");
    fs::write(&p, SCHEMA).unwrap();
    p
}

#[tokio::test(flavor = "multi_thread")]
async fn test_plan_reports_without_writing() {
    let server = MockServer::start().await;
    mount_base(&server).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let schema = schema_file(&dir);
    let out = basesync(
        &server,
        vec![
            "plan".into(),
            "--format".into(),
            "json".into(),
            "--schema".into(),
            schema.display().to_string(),
        ],
    )
    .await;

    assert_eq!(out.status.code(), Some(0));
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["dry_run"], true);
    assert_eq!(report["summary"]["planned"], 2);
    assert_eq!(
        report["tasks"][1]["mutations"][0]["mutation"]["added"],
        json!(["gold"])
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_apply_creates_field_and_extends_choices() {
    let server = MockServer::start().await;
    mount_base(&server).await;
    Mock::given(method("POST"))
        .and(path("/v0/meta/bases/appTest/tables/tblCust/fields"))
        .and(body_partial_json(json!({ "name": "city", "type": "singleLineText" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "fldCity", "name": "city", "type": "singleLineText"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/v0/meta/bases/appTest/tables/tblCust/fields/fldTier"))
        .and(body_partial_json(json!({ "options": { "choices": [
            { "id": "selB", "name": "bronze", "color": "grayLight2" },
            { "id": "selS", "name": "silver", "color": "grayLight2" },
            { "name": "gold", "color": "blueLight2" }
        ]}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "fldTier",
            "name": "tier",
            "type": "singleSelect",
            "options": { "choices": [
                { "id": "selB", "name": "bronze", "color": "grayLight2" },
                { "id": "selS", "name": "silver", "color": "grayLight2" },
                { "id": "selG", "name": "gold", "color": "blueLight2" }
            ]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let schema = schema_file(&dir);
    let report_path = dir.path().join("out/report.json");
    let out = basesync(
        &server,
        vec![
            "apply".into(),
            "--schema".into(),
            schema.display().to_string(),
            "--out".into(),
            report_path.display().to_string(),
        ],
    )
    .await;

    assert_eq!(
        out.status.code(),
        Some(0),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["summary"]["applied"], 2);
    assert_eq!(report["summary"]["mutations_failed"], 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_field_exits_with_task_failure() {
    let server = MockServer::start().await;
    mount_base(&server).await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(422).set_body_string(r#"{"error":{"type":"INVALID_FIELD_TYPE"}}"#),
        )
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "fldTier", "name": "tier", "type": "singleSelect"
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let schema = schema_file(&dir);
    let out = basesync(
        &server,
        vec!["apply".into(), "--schema".into(), schema.display().to_string()],
    )
    .await;

    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("INVALID_FIELD_TYPE"), "stderr: {stderr}");
    assert!(stderr.contains("APPLIED"), "stderr: {stderr}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_failure_exits_3() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("AUTHENTICATION_REQUIRED"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let schema = schema_file(&dir);
    let out = basesync(
        &server,
        vec!["apply".into(), "--schema".into(), schema.display().to_string()],
    )
    .await;

    assert_eq!(out.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&out.stderr).contains("no changes were made"));

    let out = basesync(&server, vec!["tables".into()]).await;
    assert_eq!(out.status.code(), Some(3));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unwritable_out_keeps_apply_exit_code() {
    let server = MockServer::start().await;
    mount_base(&server).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "fldCity", "name": "city", "type": "singleLineText"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "fldTier", "name": "tier", "type": "singleSelect"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let schema = schema_file(&dir);
    // A regular file where the report's parent directory should be.
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "").unwrap();
    let out = basesync(
        &server,
        vec![
            "apply".into(),
            "--schema".into(),
            schema.display().to_string(),
            "--out".into(),
            blocker.join("r.json").display().to_string(),
        ],
    )
    .await;

    let stderr = String::from_utf8_lossy(&out.stderr);
    assert_eq!(out.status.code(), Some(0), "stderr: {stderr}");
    assert!(stderr.contains("Summary:"), "stderr: {stderr}");
    assert!(stderr.contains("could not write report"), "stderr: {stderr}");
}
