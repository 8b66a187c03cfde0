//! End-to-end protocol tests: negotiation, dispatch, request lifecycle,
//! correlation with client replies, and capability gates.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use serde_json::json;

use easymcp::ProtocolVersion;
use easymcp_server::config::ServerConfig;

use common::{mcp_notification, TestClient, TestProvider};

#[tokio::test]
async fn test_01_initialize_echoes_each_version() {
    for version in ProtocolVersion::SUPPORTED {
        let mut client = TestClient::with_defaults();
        let resp = client.initialize(version.as_str()).await;

        let result = &resp["result"];
        assert_eq!(result["protocolVersion"], version.as_str());
        assert_eq!(result["serverInfo"]["name"], "test-server");
        assert!(result["capabilities"]["tools"].is_object());
        assert_eq!(
            client.handler.session().lock().await.protocol_version(),
            version
        );
    }
}

#[tokio::test]
async fn test_02_unsupported_version() {
    let mut client = TestClient::with_defaults();
    let resp = client.initialize("2099-01-01").await;

    assert_eq!(resp["error"]["code"], -32602);
    let data = &resp["error"]["data"];
    assert_eq!(data["requested"], "2099-01-01");
    assert_eq!(data["supported"].as_array().unwrap().len(), 4);
    assert!(resp.get("result").is_none());
}

#[tokio::test]
async fn test_03_initialized_invokes_connect_hook() {
    let provider = TestProvider::new();
    let connects = provider.connects.clone();
    let mut client = TestClient::new(ServerConfig::default(), provider);

    client.initialize("2025-06-18").await;
    client
        .send(mcp_notification("notifications/initialized", json!({})))
        .await;

    for _ in 0..50 {
        if connects.load(Ordering::SeqCst) == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(connects.load(Ordering::SeqCst), 1);
    assert!(client.handler.session().lock().await.is_initialized());
}

#[tokio::test]
async fn test_04_cancel_unknown_is_noop() {
    let mut client = TestClient::with_defaults();
    client
        .send(mcp_notification(
            "notifications/cancelled",
            json!({ "requestId": 999, "reason": "never sent" }),
        ))
        .await;

    let resp = client.request(1, "ping", json!({})).await;
    assert_eq!(resp["result"], json!({}));
    assert!(client.backlog.is_empty());
    client.assert_quiet();
}

#[tokio::test]
async fn test_05_timeout_sends_single_error() {
    let mut config = ServerConfig::default();
    config.timeout_ms = 100;
    let mut client = TestClient::new(config, TestProvider::new());

    let resp = client
        .request(5, "tools/call", json!({ "name": "slow" }))
        .await;
    assert_eq!(resp["error"]["code"], -32603);
    assert_eq!(resp["error"]["message"], "Request timed out");

    tokio::time::sleep(Duration::from_millis(200)).await;
    client.assert_quiet();
    assert!(client.handler.jobs().is_empty().await);
}

#[tokio::test]
async fn test_06_client_cancels_in_flight_request() {
    let mut client = TestClient::with_defaults();
    client
        .send(common::mcp_request(7, "tools/call", json!({ "name": "slow" })))
        .await;
    assert!(client.handler.jobs().contains(&easymcp::RequestId::Number(7)).await);

    client
        .send(mcp_notification(
            "notifications/cancelled",
            json!({ "requestId": 7 }),
        ))
        .await;

    let resp = client.response(7).await;
    assert_eq!(resp["error"]["code"], -32603);
    assert_eq!(resp["error"]["message"], "Request timed out");
    assert!(resp.get("result").is_none());

    tokio::time::sleep(Duration::from_millis(50)).await;
    client.assert_quiet();
    assert!(client.handler.jobs().is_empty().await);
}

#[tokio::test]
async fn test_07_no_lingering_jobs() {
    let mut client = TestClient::with_defaults();
    client.initialize("2025-11-25").await;

    client.request(1, "ping", json!({})).await;
    client.request(2, "tools/list", json!({})).await;
    client.request(3, "prompts/get", json!({ "name": "prompt-001" })).await;
    let missing = client
        .request(4, "tools/call", json!({ "name": "nope" }))
        .await;
    assert_eq!(missing["error"]["code"], -32602);

    assert!(client.handler.jobs().is_empty().await);
}

#[tokio::test]
async fn test_08_prompt_pagination() {
    let mut client = TestClient::new(ServerConfig::default(), TestProvider::with_prompts(250));

    let first = client.request(1, "prompts/list", json!({})).await;
    let prompts = first["result"]["prompts"].as_array().unwrap();
    assert_eq!(prompts.len(), 100);
    assert_eq!(prompts[0]["name"], "prompt-000");
    let cursor = first["result"]["nextCursor"].as_str().unwrap().to_string();

    let second = client
        .request(2, "prompts/list", json!({ "cursor": cursor }))
        .await;
    let prompts = second["result"]["prompts"].as_array().unwrap();
    assert_eq!(prompts.len(), 100);
    assert_eq!(prompts[0]["name"], "prompt-100");
    let cursor = second["result"]["nextCursor"].as_str().unwrap().to_string();

    let third = client
        .request(3, "prompts/list", json!({ "cursor": cursor }))
        .await;
    let prompts = third["result"]["prompts"].as_array().unwrap();
    assert_eq!(prompts.len(), 50);
    assert_eq!(prompts[49]["name"], "prompt-249");
    assert!(third["result"].get("nextCursor").is_none());

    let unknown = client
        .request(4, "prompts/list", json!({ "cursor": "not-a-cursor" }))
        .await;
    assert_eq!(unknown["result"]["prompts"][0]["name"], "prompt-000");
}

#[tokio::test]
async fn test_09_logging_threshold() {
    let mut client = TestClient::with_defaults();
    client.initialize("2025-06-18").await;

    let resp = client
        .request(1, "logging/setLevel", json!({ "level": "warning" }))
        .await;
    assert_eq!(resp["result"], json!({}));

    client
        .request(2, "tools/call", json!({ "name": "log_all" }))
        .await;
    let levels: Vec<String> = client
        .take_notifications("notifications/message")
        .iter()
        .map(|m| m["params"]["level"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        levels,
        vec!["warning", "error", "critical", "alert", "emergency"]
    );

    let bad = client
        .request(3, "logging/setLevel", json!({ "level": "loud" }))
        .await;
    assert_eq!(bad["error"]["code"], -32602);
}

#[tokio::test]
async fn test_10_resource_updated_requires_subscription() {
    let mut client = TestClient::with_defaults();
    client.initialize("2025-06-18").await;
    let uri = "file:///watched.txt";

    let denied = client
        .request(1, "tools/call", json!({ "name": "touch", "arguments": { "uri": uri } }))
        .await;
    assert_eq!(denied["error"]["code"], -32602);
    assert!(client
        .take_notifications("notifications/resources/updated")
        .is_empty());

    let resp = client
        .request(2, "resources/subscribe", json!({ "uri": uri }))
        .await;
    assert_eq!(resp["result"], json!({}));

    let sent = client
        .request(3, "tools/call", json!({ "name": "touch", "arguments": { "uri": uri } }))
        .await;
    assert_eq!(sent["result"]["content"][0]["text"], "sent");
    let updates = client.take_notifications("notifications/resources/updated");
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0]["params"]["uri"], uri);
}

#[tokio::test]
async fn test_11_unknown_method() {
    let mut client = TestClient::with_defaults();
    let resp = client.request(1, "resources/unsubscribe", json!({})).await;
    assert_eq!(resp["error"]["code"], -32601);
}

#[tokio::test]
async fn test_12_duplicate_in_flight_id() {
    let mut client = TestClient::with_defaults();
    client
        .send(common::mcp_request(5, "tools/call", json!({ "name": "slow" })))
        .await;

    let dup = client.request(5, "ping", json!({})).await;
    assert_eq!(dup["error"]["code"], -32600);

    client
        .send(mcp_notification(
            "notifications/cancelled",
            json!({ "requestId": 5 }),
        ))
        .await;
    let cancelled = client.response(5).await;
    assert_eq!(cancelled["error"]["code"], -32603);
}

#[tokio::test]
async fn test_13_roots_round_trip() {
    let mut client = TestClient::with_defaults();
    client
        .send(common::mcp_request(20, "tools/call", json!({ "name": "roots" })))
        .await;

    let outbound = client.next().await;
    assert_eq!(outbound["method"], "roots/list");
    client
        .send(json!({
            "jsonrpc": "2.0",
            "id": outbound["id"],
            "result": { "roots": [{ "uri": "file:///work", "name": "work" }] }
        }))
        .await;

    let resp = client.response(20).await;
    assert_eq!(resp["result"]["content"][0]["text"], "file:///work");
    assert_eq!(client.handler.correlations().len().await, 0);
}

#[tokio::test]
async fn test_14_client_error_reply_rejects_immediately() {
    let mut client = TestClient::with_defaults();
    client
        .send(common::mcp_request(21, "tools/call", json!({ "name": "roots" })))
        .await;

    let outbound = client.next().await;
    client
        .send(json!({
            "jsonrpc": "2.0",
            "id": outbound["id"],
            "error": { "code": -32001, "message": "roots denied" }
        }))
        .await;

    let resp = client.response(21).await;
    assert_eq!(resp["error"]["code"], -32001);
    assert_eq!(resp["error"]["message"], "roots denied");
}

#[tokio::test]
async fn test_15_completion_gate() {
    let mut client = TestClient::with_defaults();
    client.initialize("2025-06-18").await;
    let params = json!({
        "ref": { "type": "ref/prompt", "name": "prompt-000" },
        "argument": { "name": "language", "value": "" }
    });
    let resp = client.request(1, "completion/complete", params.clone()).await;
    assert_eq!(resp["error"]["code"], -32601);

    let mut legacy = TestClient::with_defaults();
    legacy.initialize("2024-11-05").await;
    let resp = legacy.request(1, "completion/complete", params.clone()).await;
    assert!(resp.get("result").is_some());

    let mut config = ServerConfig::default();
    config.server.supports_completion = true;
    let mut enabled = TestClient::new(config, TestProvider::new());
    enabled.initialize("2025-06-18").await;
    let resp = enabled.request(1, "completion/complete", params).await;
    let completion = &resp["result"]["completion"];
    assert_eq!(completion["values"], json!(["alpha", "mid", "zeta"]));
    assert_eq!(completion["total"], 3);
    assert_eq!(completion["hasMore"], false);
}

#[tokio::test]
async fn test_16_malformed_envelope_with_id() {
    let mut client = TestClient::with_defaults();
    client.send(json!({ "id": 3, "method": "ping" })).await;
    let resp = client.response(3).await;
    assert_eq!(resp["error"]["code"], -32600);

    client.send(json!({ "method": "ping" })).await;
    client.request(4, "ping", json!({})).await;
    assert!(client.backlog.is_empty());
}

#[tokio::test]
async fn test_16b_malformed_response_gets_no_reply() {
    let mut client = TestClient::with_defaults();
    client
        .send(json!({ "jsonrpc": "2.0", "id": 3, "error": "boom" }))
        .await;
    client.send(json!({ "jsonrpc": "2.0", "id": 4 })).await;

    client.request(5, "ping", json!({})).await;
    assert!(client.backlog.is_empty());
    client.assert_quiet();
}

#[tokio::test]
async fn test_17_unmatched_client_response_is_ignored() {
    let mut client = TestClient::with_defaults();
    client
        .send(json!({ "jsonrpc": "2.0", "id": 42, "result": {} }))
        .await;

    let resp = client.request(1, "ping", json!({})).await;
    assert_eq!(resp["result"], json!({}));
    assert!(client.backlog.is_empty());
}

#[tokio::test]
async fn test_18_prompt_lookup_by_slug() {
    let mut client = TestClient::with_defaults();
    let resp = client
        .request(1, "prompts/get", json!({ "name": "Prompt 002" }))
        .await;
    assert_eq!(
        resp["result"]["messages"][0]["content"]["text"],
        "expanded prompt-002"
    );
}

#[tokio::test]
async fn test_19_set_level_needs_logging() {
    let mut config = ServerConfig::default();
    config.server.send_logs = false;
    let mut client = TestClient::new(config, TestProvider::new());
    client.initialize("2025-06-18").await;

    let resp = client
        .request(1, "logging/setLevel", json!({ "level": "debug" }))
        .await;
    assert_eq!(resp["error"]["code"], -32603);
    assert!(client.handler.session().lock().await.log_level().is_none());
}
