//! Refresh-and-retry behavior of `PatrolClient::send` against a mock backend.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use patrol_client::store::ACCESS_TOKEN_KEY;
use patrol_client::{
    ApiError, ApiRequest, CredentialStore, MemoryTier, PatrolClient, StoreError, Tier, TierBackend,
    TokenKind,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Memory tier that counts how many times the access token was removed.
#[derive(Debug, Default)]
struct CountingTier {
    inner: MemoryTier,
    access_clears: AtomicUsize,
}

impl CountingTier {
    fn clears(&self) -> usize {
        self.access_clears.load(Ordering::SeqCst)
    }
}

impl TierBackend for CountingTier {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        if key == ACCESS_TOKEN_KEY {
            self.access_clears.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.remove(key)
    }
}

fn client_for(server: &MockServer, store: &CredentialStore) -> PatrolClient {
    PatrolClient::builder()
        .base_url(format!("{}/api", server.uri()))
        .timeout(Duration::from_millis(500))
        .store(store.clone())
        .build()
        .unwrap()
}

fn seeded_store(access: &str, refresh: &str) -> CredentialStore {
    let store = CredentialStore::in_memory();
    store
        .write(TokenKind::Access, access, &[Tier::Ephemeral])
        .unwrap();
    store
        .write(TokenKind::Refresh, refresh, &[Tier::Ephemeral])
        .unwrap();
    store
}

#[tokio::test]
async fn test_attaches_ephemeral_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/attendance/"))
        .and(header("authorization", "Bearer ephemeral"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&server)
        .await;

    let store = CredentialStore::in_memory();
    store
        .write(TokenKind::Access, "durable", &[Tier::Durable])
        .unwrap();
    store
        .write(TokenKind::Access, "ephemeral", &[Tier::Ephemeral])
        .unwrap();

    let payload = client_for(&server, &store)
        .send(ApiRequest::get("attendance/"))
        .await
        .unwrap();
    assert_eq!(payload, json!([{"id": 1}]));
}

#[tokio::test]
async fn test_no_token_sends_unauthenticated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;

    let store = CredentialStore::in_memory();
    client_for(&server, &store)
        .send(ApiRequest::get("health/"))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_created_with_empty_body_yields_empty_object() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/attendance/check-in/"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let store = seeded_store("A1", "R1");
    let payload = client_for(&server, &store)
        .send(
            ApiRequest::post("attendance/check-in/")
                .json(&json!({"latitude": 12.9, "longitude": 77.6}))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(payload, json!({}));
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_retried_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/alerts/"))
        .and(header("authorization", "Bearer A0"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Token expired"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/token/refresh/"))
        .and(body_json(json!({"refresh": "R0"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "A1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/alerts/"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    let store = seeded_store("A0", "R0");
    let payload = client_for(&server, &store)
        .send(ApiRequest::get("alerts/"))
        .await
        .unwrap();

    assert_eq!(payload, json!({"data": []}));
    // Renewed token lands in both tiers; the refresh token was not rotated.
    assert_eq!(store.read_tier(Tier::Ephemeral, TokenKind::Access).as_deref(), Some("A1"));
    assert_eq!(store.read_tier(Tier::Durable, TokenKind::Access).as_deref(), Some("A1"));
    assert_eq!(store.read(TokenKind::Refresh).as_deref(), Some("R0"));
    assert!(store.read_tier(Tier::Durable, TokenKind::Refresh).is_none());
}

#[tokio::test]
async fn test_rotated_refresh_token_is_stored() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/token/refresh/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access": "A1", "refresh": "R1"})),
        )
        .mount(&server)
        .await;

    let store = seeded_store("A0", "R0");
    client_for(&server, &store).refresh().await.unwrap();

    for tier in Tier::BOTH {
        assert_eq!(store.read_tier(tier, TokenKind::Access).as_deref(), Some("A1"));
        assert_eq!(store.read_tier(tier, TokenKind::Refresh).as_deref(), Some("R1"));
    }
}

#[tokio::test]
async fn test_second_expiry_ends_session_with_single_clear() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/reports/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "A1"})))
        .expect(1)
        .mount(&server)
        .await;

    let ephemeral = Arc::new(CountingTier::default());
    let durable = Arc::new(CountingTier::default());
    let store = CredentialStore::new(ephemeral.clone(), durable.clone());
    store
        .write(TokenKind::Access, "A0", &[Tier::Ephemeral])
        .unwrap();
    store
        .write(TokenKind::Refresh, "R0", &[Tier::Ephemeral])
        .unwrap();

    let err = client_for(&server, &store)
        .send(ApiRequest::get("reports/"))
        .await
        .unwrap_err();

    assert!(err.is_session_expired());
    assert_eq!(ephemeral.clears(), 1);
    assert_eq!(durable.clears(), 1);
    assert!(!store.has_credentials());
}

#[tokio::test]
async fn test_refresh_network_failure_clears_everything() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/guards/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    // Slower than the client timeout, so the refresh call fails in transport.
    Mock::given(method("POST"))
        .and(path("/api/auth/token/refresh/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access": "late"}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let store = CredentialStore::in_memory();
    let credential = patrol_client::Credential {
        access_token: "A0".to_string(),
        refresh_token: "R0".to_string(),
    };
    store.write_credential(&credential, &Tier::BOTH).unwrap();
    store.set_remember_me().unwrap();

    let err = client_for(&server, &store)
        .send(ApiRequest::get("guards/"))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::SessionExpired));
    for tier in Tier::BOTH {
        assert!(store.read_tier(tier, TokenKind::Access).is_none());
        assert!(store.read_tier(tier, TokenKind::Refresh).is_none());
    }
    assert!(!store.remember_me());
}

#[tokio::test]
async fn test_rejected_refresh_ends_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/token/refresh/"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"detail": "Token is blacklisted", "code": "token_not_valid"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = seeded_store("A0", "R0");
    let err = client_for(&server, &store).refresh().await.unwrap_err();

    assert!(err.is_session_expired());
    assert!(!store.has_credentials());
}

#[tokio::test]
async fn test_malformed_refresh_body_ends_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let store = seeded_store("A0", "R0");
    let err = client_for(&server, &store).refresh().await.unwrap_err();

    assert!(err.is_session_expired());
    assert!(!store.has_credentials());
}

#[tokio::test]
async fn test_missing_refresh_token_skips_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tracking/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "A1"})))
        .expect(0)
        .mount(&server)
        .await;

    let store = CredentialStore::in_memory();
    store
        .write(TokenKind::Access, "A0", &[Tier::Durable])
        .unwrap();

    let err = client_for(&server, &store)
        .send(ApiRequest::get("tracking/"))
        .await
        .unwrap_err();

    assert!(err.is_session_expired());
    assert!(!store.has_credentials());
}

#[tokio::test]
async fn test_concurrent_expiries_share_one_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer A0"))
        .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(50)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/token/refresh/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access": "A1"}))
                .set_delay(Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let store = seeded_store("A0", "R0");
    let client = client_for(&server, &store);

    let (first, second, third) = tokio::join!(
        client.send(ApiRequest::get("attendance/")),
        client.send(ApiRequest::get("alerts/")),
        client.send(ApiRequest::get("reports/")),
    );

    assert_eq!(first.unwrap(), json!({"ok": true}));
    assert_eq!(second.unwrap(), json!({"ok": true}));
    assert_eq!(third.unwrap(), json!({"ok": true}));
}

#[tokio::test]
async fn test_error_body_message_extraction() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/users/"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"email": ["already taken"], "phone": ["invalid"]})),
        )
        .mount(&server)
        .await;

    let store = seeded_store("A1", "R1");
    let err = client_for(&server, &store)
        .send(ApiRequest::post("auth/users/").json(&json!({})).unwrap())
        .await
        .unwrap_err();

    match &err {
        ApiError::Validation { status, message, body } => {
            assert_eq!(*status, 400);
            assert_eq!(message, "already taken invalid");
            assert!(body.is_some());
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    // A rejected request does not touch credentials.
    assert!(store.has_credentials());
}

#[tokio::test]
async fn test_retry_failure_other_than_expiry_keeps_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer A0"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "A1"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = seeded_store("A0", "R0");
    let err = client_for(&server, &store)
        .send(ApiRequest::get("reports/"))
        .await
        .unwrap_err();

    assert_eq!(err.message(), "HTTP status 500");
    assert_eq!(store.read(TokenKind::Access).as_deref(), Some("A1"));
}
