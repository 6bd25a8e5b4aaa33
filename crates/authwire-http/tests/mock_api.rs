//! Mock API tests for the authwire client.
//!
//! These tests use wiremock to simulate the API server and exercise the
//! session lifecycle and token renewal over real HTTP.

use std::time::Duration;

use authwire_core::{
    ApiUrl, Credentials, ErrorKind, MemoryPersistence, Registration, RequestSpec, TokenPair,
};
use authwire_http::{Client, ClientConfig, SessionState};
use futures_util::future::join_all;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper to create an API URL from a mock server.
fn mock_api_url(server: &MockServer) -> ApiUrl {
    ApiUrl::new(format!("http://127.0.0.1:{}", server.address().port())).unwrap()
}

fn client(server: &MockServer) -> Client {
    Client::new(ClientConfig::new(mock_api_url(server)), MemoryPersistence::new()).unwrap()
}

fn signed_in_client(server: &MockServer, access: &str, refresh: &str) -> Client {
    Client::new(
        ClientConfig::new(mock_api_url(server)),
        MemoryPersistence::with_pair(TokenPair::new(access, refresh)),
    )
    .unwrap()
}

fn auth_body(access: &str, refresh: &str) -> serde_json::Value {
    json!({
        "user": {"id": "u1", "email": "alice@example.com", "name": "Alice"},
        "accessToken": access,
        "refreshToken": refresh
    })
}

// ============================================================================
// Sign-in / sign-up
// ============================================================================

#[tokio::test]
async fn test_sign_in_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({
            "email": "alice@example.com",
            "password": "secret123"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("a1", "r1")))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("authorization", "Bearer a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u1",
            "email": "alice@example.com",
            "name": "Alice",
            "plan": "pro"
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let user = client
        .sign_in(&Credentials::new("alice@example.com", "secret123"))
        .await
        .unwrap();

    assert_eq!(user.id, "u1");
    assert_eq!(client.session().state(), SessionState::Authenticated);
    assert_eq!(client.store().get(), Some(TokenPair::new("a1", "r1")));

    let profile = client.session().profile().unwrap();
    assert_eq!(profile.email, "alice@example.com");
    assert_eq!(profile.extra["plan"], "pro");
}

#[tokio::test]
async fn test_sign_in_invalid_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "Unauthorized",
            "message": "Invalid email or password"
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let err = client
        .sign_in(&Credentials::new("alice@example.com", "wrong"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidCredentials);
    assert!(err.to_string().contains("Invalid email or password"));
    assert_eq!(
        client.session().state(),
        SessionState::Unauthenticated { expired: false }
    );
    assert!(client.store().get().is_none());
}

#[tokio::test]
async fn test_sign_in_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client(&server);
    let err = client
        .sign_in(&Credentials::new("alice@example.com", "secret"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Server);
    assert!(!client.session().is_authenticated());
}

#[tokio::test]
async fn test_sign_in_unreachable_server() {
    let config = ClientConfig::new(ApiUrl::new("http://127.0.0.1:1").unwrap());
    let client = Client::new(config, MemoryPersistence::new()).unwrap();

    let err = client
        .sign_in(&Credentials::new("alice@example.com", "secret"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Network);
    assert!(!client.session().is_authenticated());
}

#[tokio::test]
async fn test_sign_up_sends_name_and_signs_in() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .and(body_json(json!({
            "email": "alice@example.com",
            "password": "secret123",
            "name": "Alice"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(auth_body("a1", "r1")))
        .mount(&server)
        .await;

    let client = client(&server);
    let registration = Registration::new("alice@example.com", "secret123").with_name("Alice");
    let user = client.sign_up(&registration).await.unwrap();

    assert_eq!(user.name.as_deref(), Some("Alice"));
    assert!(client.session().is_authenticated());
    // The profile endpoint is not mocked; that must not fail the sign-up.
    assert!(client.session().profile().is_none());
}

#[tokio::test]
async fn test_sign_up_conflict() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(ResponseTemplate::new(409))
        .mount(&server)
        .await;

    let client = client(&server);
    let err = client
        .sign_up(&Registration::new("alice@example.com", "secret123"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidCredentials);
    assert!(err.to_string().contains("already exists"));
}

#[tokio::test]
async fn test_sign_in_as_another_user_drops_old_profile() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({
            "email": "alice@example.com",
            "password": "secret123"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("a1", "r1")))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({
            "email": "bob@example.com",
            "password": "hunter2"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": {"id": "u2", "email": "bob@example.com"},
            "accessToken": "b1",
            "refreshToken": "s1"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("authorization", "Bearer a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u1",
            "email": "alice@example.com"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("authorization", "Bearer b1"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client(&server);
    client
        .sign_in(&Credentials::new("alice@example.com", "secret123"))
        .await
        .unwrap();
    assert_eq!(client.session().profile().unwrap().id, "u1");

    let user = client
        .sign_in(&Credentials::new("bob@example.com", "hunter2"))
        .await
        .unwrap();

    assert_eq!(user.id, "u2");
    assert!(client.session().profile().is_none());
    assert_eq!(client.store().get(), Some(TokenPair::new("b1", "s1")));
}

#[tokio::test]
async fn test_clearing_store_signs_out() {
    let server = MockServer::start().await;

    let client = signed_in_client(&server, "a0", "r0");
    assert!(client.session().is_authenticated());

    client.store().clear();

    assert_eq!(
        client.session().state(),
        SessionState::Unauthenticated { expired: false }
    );
}

// ============================================================================
// Token renewal
// ============================================================================

#[tokio::test]
async fn test_concurrent_expired_requests_refresh_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(header("authorization", "Bearer a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"files": []})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(header("authorization", "Bearer a0"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "TokenExpired",
            "message": "access token expired"
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({"refreshToken": "r0"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"accessToken": "a1", "refreshToken": "r1"}))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in_client(&server, "a0", "r0");
    let results = join_all((0..5).map(|_| {
        let client = client.clone();
        async move { client.execute(RequestSpec::get("/files").unwrap()).await }
    }))
    .await;

    for result in results {
        assert_eq!(result.unwrap().status(), 200);
    }
    assert_eq!(client.store().get(), Some(TokenPair::new("a1", "r1")));
    assert_eq!(client.coordinator().exchange_count(), 1);

    let retried = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| {
            r.url.path() == "/files"
                && r.headers
                    .get("authorization")
                    .is_some_and(|v| v.as_bytes() == b"Bearer a1")
        })
        .count();
    assert_eq!(retried, 5);
}

#[tokio::test]
async fn test_rejected_refresh_token_signs_out() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "InvalidGrant",
            "message": "refresh token revoked"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in_client(&server, "a0", "r0");
    let mut watch = client.session().watch();
    assert_eq!(*watch.borrow_and_update(), SessionState::Authenticated);

    let err = client
        .execute(RequestSpec::get("/files").unwrap())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RefreshFailed);
    assert!(err.to_string().contains("refresh token revoked"));
    assert!(client.store().get().is_none());
    assert!(watch.has_changed().unwrap());
    assert_eq!(
        *watch.borrow_and_update(),
        SessionState::Unauthenticated { expired: true }
    );
}

#[tokio::test]
async fn test_sign_out_during_refresh_wins() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"accessToken": "a1", "refreshToken": "r1"}))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = signed_in_client(&server, "a0", "r0");
    let pending = {
        let client = client.clone();
        tokio::spawn(async move { client.execute(RequestSpec::get("/files").unwrap()).await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(client.coordinator().is_refreshing());
    client.sign_out().await;

    let err = pending.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RefreshFailed);
    assert!(client.store().get().is_none());
    assert_eq!(
        client.session().state(),
        SessionState::Unauthenticated { expired: false }
    );
}

// ============================================================================
// Sign-out and bootstrap
// ============================================================================

#[tokio::test]
async fn test_sign_out_ignores_server_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .and(header("authorization", "Bearer a0"))
        .and(body_json(json!({"refreshToken": "r0"})))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in_client(&server, "a0", "r0");
    client.sign_out().await;

    assert!(client.store().get().is_none());
    assert_eq!(
        client.session().state(),
        SessionState::Unauthenticated { expired: false }
    );

    // Signing out again does nothing, and does not call the server.
    client.sign_out().await;
    assert!(!client.session().is_authenticated());
}

#[tokio::test]
async fn test_sign_out_is_bounded_by_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let config =
        ClientConfig::new(mock_api_url(&server)).with_sign_out_timeout(Duration::from_millis(100));
    let client = Client::new(
        config,
        MemoryPersistence::with_pair(TokenPair::new("a0", "r0")),
    )
    .unwrap();

    let started = std::time::Instant::now();
    client.sign_out().await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(client.store().get().is_none());
}

#[tokio::test]
async fn test_bootstrap_trusts_stored_tokens() {
    let server = MockServer::start().await;

    let signed_in = signed_in_client(&server, "a0", "r0");

    assert_eq!(signed_in.session().state(), SessionState::Authenticated);
    assert!(server.received_requests().await.unwrap().is_empty());

    let empty = client(&server);
    assert_eq!(
        empty.session().state(),
        SessionState::Unauthenticated { expired: false }
    );
}
