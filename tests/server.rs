//! HTTP tests for the save handler server.

mod common;

use common::{FakeKnowledgeBase, FixedClock, MemoryStore};
use kbchat::save_handler::{SaveHandler, SaveSettings};
use kbchat::server::router;
use serde_json::{json, Value};
use std::sync::Arc;

/// Serve a handler on an ephemeral port and return its base URL.
async fn spawn_server(store: Arc<MemoryStore>, kb: Arc<FakeKnowledgeBase>) -> String {
    let handler = SaveHandler::new(
        store,
        kb,
        Arc::new(FixedClock::at(2024, 7, 1, 9, 30, 0)),
        SaveSettings {
            knowledge_base_id: "KB1".into(),
            save_folder: "save_data".into(),
            presign_expiry_secs: 18_000,
        },
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(Arc::new(handler))).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn health_reports_version() {
    let base = spawn_server(
        Arc::new(MemoryStore::default()),
        Arc::new(FakeKnowledgeBase::with_sources(&["DS1"])),
    )
    .await;

    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn invoke_saves_and_returns_envelope() {
    let store = Arc::new(MemoryStore::default());
    let kb = Arc::new(FakeKnowledgeBase::with_sources(&["DS1"]));
    let base = spawn_server(store.clone(), kb.clone()).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/invoke", base))
        .json(&json!({
            "actionGroup": "file_actions",
            "function": "save_file",
            "parameters": [
                {"name": "file_name", "type": "string", "value": "application_inventory.json"},
                {"name": "content", "type": "string", "value": "{\"apps\":[]}"}
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let envelope: Value = resp.json().await.unwrap();
    assert_eq!(envelope["messageVersion"], "1.0");
    assert_eq!(envelope["response"]["actionGroup"], "file_actions");
    assert!(envelope["response"]["functionResponse"]["responseBody"]["TEXT"]["body"].is_string());

    let stored = store
        .object("save_data/2024-07-01T09-30-00Z_application_inventory.json")
        .unwrap();
    assert_eq!(
        String::from_utf8(stored.body).unwrap(),
        "{\n  \"apps\": []\n}"
    );
    assert_eq!(kb.start_count(), 1);
}

#[tokio::test]
async fn invoke_without_content_is_400() {
    let store = Arc::new(MemoryStore::default());
    let kb = Arc::new(FakeKnowledgeBase::with_sources(&["DS1"]));
    let base = spawn_server(store.clone(), kb.clone()).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/invoke", base))
        .json(&json!({
            "actionGroup": "file_actions",
            "function": "save_file",
            "parameters": [
                {"name": "file_name", "type": "string", "value": "a.md"},
                {"name": "content", "type": "string", "value": ""}
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body,
        json!({"statusCode": 400, "body": "Missing 'content' in request."})
    );
    assert_eq!(store.put_count(), 0);
    assert_eq!(kb.start_count(), 0);
}

#[tokio::test]
async fn malformed_event_is_bad_request() {
    let base = spawn_server(
        Arc::new(MemoryStore::default()),
        Arc::new(FakeKnowledgeBase::with_sources(&["DS1"])),
    )
    .await;

    let resp = reqwest::Client::new()
        .post(format!("{}/invoke", base))
        .json(&json!({"parameters": "not-a-list"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
}
