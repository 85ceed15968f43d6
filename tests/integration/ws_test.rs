//! Integration tests for streaming over a real WebSocket.

mod helpers;

use futures::SinkExt;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use helpers::{TestServer, expect_closed, eventually, next_frame, texts};

#[tokio::test]
async fn test_empty_backlog_then_live_message() {
    let server = TestServer::spawn().await;
    let token = server.app.issue_token("c1", None).await;
    let mut socket = server.connect(&token).await.expect("connect");

    let backlog = next_frame(&mut socket).await;
    assert!(backlog.messages.is_empty());
    assert_eq!(backlog.watermark, Some(0));

    server.app.post_text("c1", "m1").await;

    let live = next_frame(&mut socket).await;
    assert_eq!(texts(&live), vec!["m1"]);
    assert_eq!(live.watermark, Some(1));

    server.shutdown().await;
}

#[tokio::test]
async fn test_backlog_arrives_as_one_frame() {
    let server = TestServer::spawn().await;
    for text in ["m1", "m2", "m3"] {
        server.app.post_text("c1", text).await;
    }

    let token = server.app.issue_token("c1", None).await;
    let mut socket = server.connect(&token).await.expect("connect");

    let backlog = next_frame(&mut socket).await;
    assert_eq!(texts(&backlog), vec!["m1", "m2", "m3"]);
    assert_eq!(backlog.watermark, Some(3));

    server.app.post_text("c1", "m4").await;
    let live = next_frame(&mut socket).await;
    assert_eq!(texts(&live), vec!["m4"]);
    assert_eq!(live.watermark, Some(4));

    server.shutdown().await;
}

#[tokio::test]
async fn test_resume_skips_delivered_prefix() {
    let server = TestServer::spawn().await;
    for text in ["m1", "m2", "m3"] {
        server.app.post_text("c1", text).await;
    }

    let token = server.app.issue_token("c1", Some(2)).await;
    let mut socket = server.connect(&token).await.expect("connect");

    let backlog = next_frame(&mut socket).await;
    assert_eq!(texts(&backlog), vec!["m3"]);
    assert_eq!(backlog.watermark, Some(3));

    server.shutdown().await;
}

#[tokio::test]
async fn test_token_cannot_be_reused() {
    let server = TestServer::spawn().await;
    let token = server.app.issue_token("c1", None).await;

    let _socket = server.connect(&token).await.expect("first connect");

    match server.connect(&token).await {
        Err(WsError::Http(response)) => assert_eq!(response.status().as_u16(), 403),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("token accepted twice"),
    }

    server.shutdown().await;
}

#[tokio::test]
async fn test_conversations_are_isolated() {
    let server = TestServer::spawn().await;
    let token = server.app.issue_token("c1", None).await;
    let mut socket = server.connect(&token).await.expect("connect");
    next_frame(&mut socket).await;

    server.app.post_text("c2", "elsewhere").await;
    server.app.post_text("c1", "here").await;

    let live = next_frame(&mut socket).await;
    assert_eq!(texts(&live), vec!["here"]);
    assert_eq!(live.watermark, Some(1));

    server.shutdown().await;
}

#[tokio::test]
async fn test_two_sockets_on_one_conversation() {
    let server = TestServer::spawn().await;
    let first_token = server.app.issue_token("c1", None).await;
    let second_token = server.app.issue_token("c1", None).await;

    let mut first = server.connect(&first_token).await.expect("connect");
    let mut second = server.connect(&second_token).await.expect("connect");
    next_frame(&mut first).await;
    next_frame(&mut second).await;

    server.app.post_text("c1", "both").await;

    assert_eq!(texts(&next_frame(&mut first).await), vec!["both"]);
    assert_eq!(texts(&next_frame(&mut second).await), vec!["both"]);

    server.shutdown().await;
}

#[tokio::test]
async fn test_client_close_releases_stream() {
    let server = TestServer::spawn().await;
    let token = server.app.issue_token("c1", None).await;
    let mut socket = server.connect(&token).await.expect("connect");
    next_frame(&mut socket).await;

    let engine = server.app.state.engine.clone();
    let store = server.app.state.store.clone();
    assert_eq!(engine.pool().stream_count(), 1);
    assert_eq!(store.listener_count(), 1);

    socket.send(WsMessage::Close(None)).await.expect("send close");

    eventually(|| engine.pool().stream_count() == 0).await;
    eventually(|| store.listener_count() == 0).await;
    assert_eq!(engine.metrics().streams_active, 0);

    server.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_closes_open_sockets() {
    let server = TestServer::spawn().await;
    let token = server.app.issue_token("c1", None).await;
    let mut socket = server.connect(&token).await.expect("connect");
    next_frame(&mut socket).await;

    let store = server.app.state.store.clone();
    server.shutdown().await;

    expect_closed(&mut socket).await;
    assert_eq!(store.listener_count(), 0);
}
