//! Integration tests for token issuance and the message endpoints.

mod helpers;

use axum::http::StatusCode;

use convey_core::config::AppConfig;

#[tokio::test]
async fn test_issue_token_response_shape() {
    let app = helpers::TestApp::new();

    let response = app
        .request("POST", "/api/conversations/conv-1/stream", None)
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["success"], true);
    let data = &response.body["data"];
    assert_eq!(data["conversation_id"], "conv-1");
    assert_eq!(data["expires_in"], 1800);

    let token = data["token"].as_str().expect("token");
    assert_eq!(token.len(), 22);
    assert!(
        token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    );
}

#[tokio::test]
async fn test_tokens_are_distinct() {
    let app = helpers::TestApp::new();

    let first = app.issue_token("conv-1", None).await;
    let second = app.issue_token("conv-1", None).await;

    assert_ne!(first, second);
    assert_eq!(app.state.engine.registry().pending_count(), 2);
}

#[tokio::test]
async fn test_configured_ttl_is_reported() {
    let config = AppConfig::from_toml("[stream]\ntoken_ttl_seconds = 60\n").expect("config");
    let app = helpers::TestApp::with_config(config);

    let response = app
        .request("POST", "/api/conversations/conv-1/stream", None)
        .await;

    assert_eq!(response.body["data"]["expires_in"], 60);
}

#[tokio::test]
async fn test_ws_upgrade_without_token() {
    let app = helpers::TestApp::new();

    let response = app.request("GET", "/ws", None).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ws_upgrade_with_unknown_token() {
    let app = helpers::TestApp::new();

    let response = app.request("GET", "/ws?t=AAAAAAAAAAAAAAAAAAAAAA", None).await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["error"], "TOKEN_NOT_FOUND");
}

#[tokio::test]
async fn test_messages_poll_with_watermark() {
    let app = helpers::TestApp::new();
    for text in ["a", "b", "c", "d"] {
        assert_eq!(app.post_text("conv-1", text).await.status, StatusCode::CREATED);
    }
    app.post_text("conv-2", "other").await;

    let all = app.request("GET", "/api/conversations/conv-1/messages", None).await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(all.body["watermark"], 4);
    assert_eq!(all.body["messages"].as_array().map(Vec::len), Some(4));

    let tail = app
        .request("GET", "/api/conversations/conv-1/messages?watermark=3", None)
        .await;
    assert_eq!(tail.body["watermark"], 4);
    assert_eq!(tail.body["messages"][0]["text"], "d");
    assert_eq!(tail.body["messages"][0]["id"], "conv-1|0000003");

    let empty = app
        .request("GET", "/api/conversations/conv-9/messages", None)
        .await;
    assert_eq!(empty.body["watermark"], 0);
    assert_eq!(empty.body["messages"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_post_message_defaults_type() {
    let app = helpers::TestApp::new();

    let response = app
        .request(
            "POST",
            "/api/conversations/conv-1/messages",
            Some(serde_json::json!({ "text": "hi" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["data"]["message"]["type"], "message");
    assert_eq!(response.body["data"]["id"], "conv-1|0000000");
}

#[tokio::test]
async fn test_health_check() {
    let app = helpers::TestApp::new();

    let response = app.request("GET", "/api/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "ok");
    assert_eq!(response.body["data"]["active_streams"], 0);
}
