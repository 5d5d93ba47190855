//! Integration tests for the request executor, token refresh and chat stream

use futures::future::join_all;
use liberclaw_api::endpoints::chat::ChatMessage;
use liberclaw_api::{Api, ApiError, Client, EmptyResponse, StreamEnd};
use liberclaw_auth::{MemoryTokenStore, TokenPair, TokenStore};
use mockito::{Matcher, Server};
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const PROFILE: &str = r#"{
    "id": "6f1c2a52-3f0e-4d59-9f43-2d1b7f0e9a10",
    "email": "ada@example.com",
    "email_verified": true,
    "display_name": "Ada",
    "avatar_url": null,
    "tier": "free",
    "show_tool_calls": false,
    "created_at": "2025-01-02T03:04:05Z"
}"#;

const ROTATED: &str = r#"{
    "access_token": "access-2",
    "refresh_token": "refresh-2",
    "token_type": "bearer",
    "expires_in": 900
}"#;

fn signed_in() -> Arc<MemoryTokenStore> {
    Arc::new(MemoryTokenStore::with_tokens(TokenPair::new(
        "access-1", "refresh-1", 900,
    )))
}

fn client(server: &Server, store: Arc<MemoryTokenStore>) -> Client {
    Client::new(server.url(), store).expect("Failed to build client")
}

#[tokio::test]
async fn valid_token_needs_no_refresh() {
    //* Given
    let mut server = Server::new_async().await;
    let me = server
        .mock("GET", "/users/me")
        .match_header("authorization", "Bearer access-1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(PROFILE)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/refresh")
        .expect(0)
        .create_async()
        .await;

    //* When
    let profile = client(&server, signed_in())
        .send(Api::users().me())
        .await
        .expect("Profile request failed");

    //* Then
    me.assert_async().await;
    refresh.assert_async().await;
    assert_eq!(profile.label(), "Ada");
}

#[tokio::test]
async fn concurrent_unauthorized_requests_share_one_refresh() {
    //* Given
    let mut server = Server::new_async().await;
    let expired = server
        .mock("GET", "/users/me")
        .match_header("authorization", "Bearer access-1")
        .with_status(401)
        .with_body(r#"{"detail": "Token expired"}"#)
        .expect_at_least(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/refresh")
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::Json(serde_json::json!({"refresh_token": "refresh-1"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(ROTATED)
        .expect(1)
        .create_async()
        .await;
    let fresh = server
        .mock("GET", "/users/me")
        .match_header("authorization", "Bearer access-2")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(PROFILE)
        .expect(5)
        .create_async()
        .await;

    let store = signed_in();
    let client = client(&server, store.clone());

    //* When
    let results = join_all((0..5).map(|_| client.send(Api::users().me()))).await;

    //* Then
    expired.assert_async().await;
    refresh.assert_async().await;
    fresh.assert_async().await;
    assert!(results.iter().all(Result::is_ok), "{results:?}");

    let stored = store.read().unwrap().expect("Tokens should be stored");
    assert_eq!(stored.access_token, "access-2");
    assert_eq!(stored.refresh_token, "refresh-2");
}

#[tokio::test]
async fn rejected_refresh_fails_every_caller_and_clears_tokens() {
    //* Given
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/users/me")
        .with_status(401)
        .expect_at_least(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/refresh")
        .with_status(401)
        .with_body(r#"{"detail": "Refresh token revoked"}"#)
        .expect(1)
        .create_async()
        .await;

    let store = signed_in();
    let client = client(&server, store.clone());

    //* When
    let results = join_all((0..3).map(|_| client.send(Api::users().me()))).await;

    //* Then
    refresh.assert_async().await;
    for result in results {
        let err = result.expect_err("Request should fail");
        assert!(err.is_session_expired(), "{err:?}");
    }
    assert!(store.read().unwrap().is_none());
}

#[tokio::test]
async fn request_is_retried_only_once() {
    //* Given
    let mut server = Server::new_async().await;
    let me = server
        .mock("GET", "/users/me")
        .with_status(401)
        .with_body(r#"{"detail": "Forbidden for this tier"}"#)
        .expect(2)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/refresh")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(ROTATED)
        .expect(1)
        .create_async()
        .await;

    //* When
    let err = client(&server, signed_in())
        .send(Api::users().me())
        .await
        .expect_err("Second 401 should surface");

    //* Then
    me.assert_async().await;
    refresh.assert_async().await;
    assert!(err.is_unauthorized());
    assert_eq!(err.to_string(), "Forbidden for this tier");
}

#[tokio::test]
async fn credential_free_requests_carry_no_token() {
    //* Given
    let mut server = Server::new_async().await;
    let guest = server
        .mock("POST", "/auth/guest")
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::Json(serde_json::json!({"device_id": "device-1"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(ROTATED)
        .expect(1)
        .create_async()
        .await;

    //* When
    let pair = client(&server, signed_in())
        .send(Api::auth().guest("device-1"))
        .await
        .expect("Guest login failed");

    //* Then
    guest.assert_async().await;
    assert_eq!(pair.access_token, "access-2");
}

#[tokio::test]
async fn no_content_decodes_as_empty_response() {
    //* Given
    let mut server = Server::new_async().await;
    let agent_id = Uuid::new_v4();
    let clear = server
        .mock("DELETE", format!("/chat/{agent_id}").as_str())
        .with_status(204)
        .expect(1)
        .create_async()
        .await;

    //* When
    let result = client(&server, signed_in())
        .send(Api::chat(agent_id).clear())
        .await
        .expect("Clear failed");

    //* Then
    clear.assert_async().await;
    assert_eq!(result, EmptyResponse);
}

#[tokio::test]
async fn error_detail_is_surfaced() {
    //* Given
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/usage/")
        .with_status(429)
        .with_body(r#"{"detail": "Daily message limit reached"}"#)
        .create_async()
        .await;

    //* When
    let err = client(&server, signed_in())
        .send(Api::usage().summary())
        .await
        .expect_err("Usage should fail");

    //* Then
    assert_eq!(err.status().map(|status| status.as_u16()), Some(429));
    assert_eq!(err.to_string(), "Daily message limit reached");
}

#[tokio::test]
async fn chat_stream_delivers_events() {
    //* Given
    let mut server = Server::new_async().await;
    let agent_id = Uuid::new_v4();
    let chat = server
        .mock("POST", format!("/chat/{agent_id}").as_str())
        .match_header("authorization", "Bearer access-1")
        .match_header("accept", "text/event-stream")
        .match_body(Matcher::Json(serde_json::json!({"message": "hello"})))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(concat!(
            "data: {\"type\":\"keepalive\"}\n\n",
            "data: {\"type\":\"text\",\"content\":\"Hi there\"}\n\n",
            "data: {\"type\":\"done\"}\n\n",
            "data: {\"type\":\"text\",\"content\":\"trunc",
        ))
        .expect(1)
        .create_async()
        .await;

    //* When
    let mut events = Vec::new();
    let end = client(&server, signed_in())
        .chat(agent_id)
        .send("hello", &CancellationToken::new(), |event| events.push(event))
        .await
        .expect("Stream failed");

    //* Then
    chat.assert_async().await;
    assert_eq!(end, StreamEnd::Completed);
    assert_eq!(
        events,
        vec![
            ChatMessage::Text {
                content: "Hi there".into(),
                name: None
            },
            ChatMessage::Done,
        ]
    );
}

#[tokio::test]
async fn chat_stream_rejection_is_not_refreshed() {
    //* Given
    let mut server = Server::new_async().await;
    let agent_id = Uuid::new_v4();
    server
        .mock("POST", format!("/chat/{agent_id}").as_str())
        .with_status(401)
        .with_body(r#"{"detail": "Token expired"}"#)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/refresh")
        .expect(0)
        .create_async()
        .await;

    //* When
    let mut events = Vec::new();
    let result = client(&server, signed_in())
        .chat(agent_id)
        .send("hello", &CancellationToken::new(), |event| events.push(event))
        .await;

    //* Then
    refresh.assert_async().await;
    assert!(matches!(result, Err(ref err @ ApiError::Http { .. }) if err.is_unauthorized()));
    assert!(events.is_empty());
}

#[tokio::test]
async fn cancelled_before_send_makes_no_request() {
    //* Given
    let mut server = Server::new_async().await;
    let agent_id = Uuid::new_v4();
    let chat = server
        .mock("POST", format!("/chat/{agent_id}").as_str())
        .expect(0)
        .create_async()
        .await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    //* When
    let end = client(&server, signed_in())
        .chat(agent_id)
        .send("hello", &cancel, |_| panic!("No events expected"))
        .await
        .expect("Cancellation is not an error");

    //* Then
    chat.assert_async().await;
    assert_eq!(end, StreamEnd::Cancelled);
}

#[tokio::test]
async fn usage_history_sends_window_as_query() {
    //* Given
    let mut server = Server::new_async().await;
    let history = server
        .mock("GET", "/usage/history")
        .match_query(Matcher::UrlEncoded("days".into(), "7".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"days": [{"date": "2025-01-01", "message_count": 3}]}"#)
        .expect(1)
        .create_async()
        .await;

    //* When
    let result = client(&server, signed_in())
        .send(Api::usage().history(7))
        .await
        .expect("History request failed");

    //* Then
    history.assert_async().await;
    assert_eq!(result.total_messages(), 3);
}

#[tokio::test]
async fn unauthorized_without_token_is_not_refreshed() {
    //* Given
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/users/me")
        .match_header("authorization", Matcher::Missing)
        .with_status(401)
        .with_body(r#"{"detail": "Not authenticated"}"#)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/refresh")
        .expect(0)
        .create_async()
        .await;

    //* When
    let err = client(&server, Arc::new(MemoryTokenStore::new()))
        .send(Api::users().me())
        .await
        .expect_err("Should be unauthorized");

    //* Then
    refresh.assert_async().await;
    assert!(err.is_unauthorized());
    assert!(!err.is_session_expired());
}

#[tokio::test]
async fn rotated_or_unknown_token_returns_stored_pair() {
    //* Given
    let mut server = Server::new_async().await;
    let refresh = server
        .mock("POST", "/auth/refresh")
        .expect(0)
        .create_async()
        .await;
    let store = Arc::new(MemoryTokenStore::with_tokens(TokenPair::new(
        "access-2", "refresh-2", 900,
    )));
    let client = client(&server, store);

    //* When
    let rotated = client
        .refresh_tokens(Some("access-1"))
        .await
        .expect("Stored pair expected");
    let unknown = client
        .refresh_tokens(None)
        .await
        .expect("Stored pair expected");

    //* Then
    refresh.assert_async().await;
    assert_eq!(rotated.refresh_token, "refresh-2");
    assert_eq!(unknown.refresh_token, "refresh-2");
}

#[tokio::test]
async fn each_expiry_gets_its_own_refresh() {
    //* Given
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/users/me")
        .match_header("authorization", "Bearer access-1")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    server
        .mock("GET", "/users/me")
        .match_header("authorization", "Bearer access-2")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(PROFILE)
        .expect(1)
        .create_async()
        .await;
    server
        .mock("GET", "/usage/")
        .match_header("authorization", "Bearer access-2")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    server
        .mock("GET", "/usage/")
        .match_header("authorization", "Bearer access-3")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"daily_messages_used": 4, "daily_messages_limit": 50,
                "agent_count": 1, "agent_limit": 1, "tier": "free"}"#,
        )
        .expect(1)
        .create_async()
        .await;
    let first = server
        .mock("POST", "/auth/refresh")
        .match_body(Matcher::Json(serde_json::json!({"refresh_token": "refresh-1"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(ROTATED)
        .expect(1)
        .create_async()
        .await;
    let second = server
        .mock("POST", "/auth/refresh")
        .match_body(Matcher::Json(serde_json::json!({"refresh_token": "refresh-2"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"access_token": "access-3", "refresh_token": "refresh-3", "expires_in": 900}"#,
        )
        .expect(1)
        .create_async()
        .await;

    let store = signed_in();
    let client = client(&server, store.clone());

    //* When
    let profile = client.send(Api::users().me()).await;
    let usage = client.send(Api::usage().summary()).await;

    //* Then
    first.assert_async().await;
    second.assert_async().await;
    assert!(profile.is_ok(), "{profile:?}");
    assert_eq!(usage.expect("Usage failed").messages_remaining(), 46);
    assert_eq!(store.read().unwrap().unwrap().refresh_token, "refresh-3");
}

#[tokio::test(flavor = "multi_thread")]
async fn abandoned_refresh_does_not_leak_into_next_session() {
    //* Given
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/users/me")
        .match_header("authorization", "Bearer access-1")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let slow_rejection = server
        .mock("POST", "/auth/refresh")
        .match_body(Matcher::Json(serde_json::json!({"refresh_token": "refresh-1"})))
        .with_status(401)
        .with_chunked_body(|w| {
            std::thread::sleep(Duration::from_millis(300));
            w.write_all(br#"{"detail": "revoked"}"#)
        })
        .expect(1)
        .create_async()
        .await;

    let store = signed_in();
    let client = client(&server, store.clone());

    // The only waiter gives up while the refresh is still running.
    let abandoned =
        tokio::time::timeout(Duration::from_millis(50), client.send(Api::users().me())).await;
    assert!(abandoned.is_err());

    for _ in 0..200 {
        if store.read().unwrap().is_none() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(store.read().unwrap().is_none(), "Failed refresh should clear tokens");

    // A new sign-in whose access token then expires.
    store
        .write(&TokenPair::new("access-3", "refresh-3", 900))
        .unwrap();
    server
        .mock("GET", "/users/me")
        .match_header("authorization", "Bearer access-3")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let renewal = server
        .mock("POST", "/auth/refresh")
        .match_body(Matcher::Json(serde_json::json!({"refresh_token": "refresh-3"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(ROTATED)
        .expect(1)
        .create_async()
        .await;
    server
        .mock("GET", "/users/me")
        .match_header("authorization", "Bearer access-2")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(PROFILE)
        .expect(1)
        .create_async()
        .await;

    //* When
    let result = client.send(Api::users().me()).await;

    //* Then
    slow_rejection.assert_async().await;
    renewal.assert_async().await;
    assert!(result.is_ok(), "{result:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn chat_stream_error_body_is_bounded_by_idle_timeout() {
    //* Given
    let mut server = Server::new_async().await;
    let agent_id = Uuid::new_v4();
    server
        .mock("POST", format!("/chat/{agent_id}").as_str())
        .with_status(502)
        .with_chunked_body(|w| {
            std::thread::sleep(Duration::from_secs(3));
            w.write_all(br#"{"detail": "late"}"#)
        })
        .create_async()
        .await;
    let client =
        client(&server, signed_in()).with_stream_idle_timeout(Duration::from_millis(200));

    //* When
    let started = Instant::now();
    let result = client
        .chat(agent_id)
        .send("hello", &CancellationToken::new(), |_| panic!("No events expected"))
        .await;

    //* Then
    assert!(matches!(result, Err(ApiError::Timeout)), "{result:?}");
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn agent_file_is_downloaded_as_bytes() {
    //* Given
    let mut server = Server::new_async().await;
    let agent_id = Uuid::new_v4();
    let download = server
        .mock("GET", format!("/files/{agent_id}/out/report.pdf").as_str())
        .match_header("authorization", "Bearer access-1")
        .with_status(200)
        .with_header("content-type", "application/octet-stream")
        .with_header("content-disposition", "attachment; filename=\"report.pdf\"")
        .with_body(b"%PDF-1.7\n\x00\xff")
        .expect(1)
        .create_async()
        .await;

    //* When
    let file = client(&server, signed_in())
        .send(Api::agents().file(agent_id, "out/report.pdf"))
        .await
        .expect("Download failed");

    //* Then
    download.assert_async().await;
    assert_eq!(file.data, b"%PDF-1.7\n\x00\xff");
    assert_eq!(file.save_name("out/report.pdf"), Some("report.pdf"));
    assert_eq!(file.content_type.as_deref(), Some("application/octet-stream"));
}
