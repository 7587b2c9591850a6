//! Main client implementation.
//!
//! Every authenticated call goes through [`PatrolClient::send`], which
//! attaches the current bearer token, and on a 401 renews the credential and
//! retries the call exactly once.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Mutex;
use url::Url;

use crate::api::{AuthApi, UsersApi};
use crate::envelope::{self, decode};
use crate::error::{ApiError, Result};
use crate::store::{CredentialStore, Tier, TokenKind};
use crate::types::{TokenRefreshRequest, TokenRefreshResponse};

/// Default timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Token refresh endpoint, relative to the base URL.
pub const REFRESH_PATH: &str = "auth/token/refresh/";

/// A backend call: method, path relative to the base URL, optional JSON body.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }
}

/// Patrol API client.
///
/// Owns the HTTP connection pool and shares a [`CredentialStore`] with the
/// session layer. Cloning is cheap; clones share the pool, store and refresh
/// lock.
///
/// # Example
///
/// ```no_run
/// use patrol_client::{ApiRequest, PatrolClient};
///
/// # async fn example() -> patrol_client::Result<()> {
/// let client = PatrolClient::builder()
///     .base_url("http://localhost:8000/api")
///     .build()?;
///
/// let payload = client.send(ApiRequest::get("attendance/")).await?;
/// println!("{}", payload);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PatrolClient {
    inner: Arc<ClientInner>,
}

/// Inner client state (shared across clones).
pub(crate) struct ClientInner {
    /// HTTP client.
    pub(crate) http: reqwest::Client,
    /// Base URL for API requests.
    pub(crate) base_url: Url,
    /// Request timeout.
    pub(crate) timeout: Duration,
    /// Credential tiers.
    pub(crate) store: CredentialStore,
    /// Held while a refresh is in flight.
    pub(crate) refresh_lock: Mutex<()>,
}

impl std::fmt::Debug for PatrolClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatrolClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("timeout", &self.inner.timeout)
            .finish_non_exhaustive()
    }
}

impl PatrolClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// The credential store this client reads tokens from.
    pub fn store(&self) -> &CredentialStore {
        &self.inner.store
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Access the auth API (login, profile, password).
    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.clone())
    }

    /// Access the user management API.
    pub fn users(&self) -> UsersApi {
        UsersApi::new(self.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Authenticated requests
    // ─────────────────────────────────────────────────────────────────────────

    /// Send a request with the current bearer token, renewing it on expiry.
    ///
    /// On a 401 the refresh protocol runs and the request is retried once.
    /// A failed refresh, or a second 401 on the retry, clears all stored
    /// credentials and yields [`ApiError::SessionExpired`].
    pub async fn send(&self, request: ApiRequest) -> Result<Value> {
        let token = self.inner.store.read(TokenKind::Access);
        let response = self.dispatch(&request, token.as_deref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return self.handle_response(response).await;
        }

        tracing::debug!(path = %request.path, "credential expired, refreshing");
        self.refresh_after_expiry(token.as_deref()).await?;

        let token = self.inner.store.read(TokenKind::Access);
        let retry = self.dispatch(&request, token.as_deref()).await?;
        if retry.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!(path = %request.path, "credential rejected after refresh, ending session");
            self.terminate_session();
            return Err(ApiError::SessionExpired);
        }
        self.handle_response(retry).await
    }

    /// Send a request without a bearer token and without refresh handling.
    ///
    /// Used for sign-in and registration, where a stale token must not be
    /// attached and a 401 is an ordinary rejection.
    pub async fn send_anonymous(&self, request: ApiRequest) -> Result<Value> {
        let response = self.dispatch(&request, None).await?;
        self.handle_response(response).await
    }

    /// Make a GET request and decode the payload.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        decode(self.send(ApiRequest::get(path)).await?)
    }

    /// Make a POST request and decode the payload.
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        decode(self.send(ApiRequest::post(path).json(body)?).await?)
    }

    /// Make a PUT request and decode the payload.
    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        decode(self.send(ApiRequest::put(path).json(body)?).await?)
    }

    /// Make a PATCH request and decode the payload.
    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        decode(self.send(ApiRequest::patch(path).json(body)?).await?)
    }

    /// Make a DELETE request.
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send(ApiRequest::delete(path)).await.map(|_| ())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Refresh protocol
    // ─────────────────────────────────────────────────────────────────────────

    /// Exchange the stored refresh token for a new credential.
    ///
    /// Always calls the backend. On any failure all credentials are cleared
    /// and [`ApiError::SessionExpired`] is returned.
    pub async fn refresh(&self) -> Result<()> {
        let _guard = self.inner.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Refresh on behalf of a request that was rejected while carrying
    /// `stale`. Concurrent expiries share one refresh: a caller that finds
    /// the stored token already replaced skips the network call.
    async fn refresh_after_expiry(&self, stale: Option<&str>) -> Result<()> {
        let _guard = self.inner.refresh_lock.lock().await;

        if let Some(current) = self.inner.store.read(TokenKind::Access)
            && Some(current.as_str()) != stale
        {
            tracing::debug!("credential already renewed by a concurrent request");
            return Ok(());
        }

        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> Result<()> {
        match self.exchange_refresh_token().await {
            Ok(()) => {
                tracing::info!("credential refreshed");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "credential refresh failed, ending session");
                self.terminate_session();
                Err(ApiError::SessionExpired)
            }
        }
    }

    async fn exchange_refresh_token(&self) -> Result<()> {
        let refresh_token = self
            .inner
            .store
            .read(TokenKind::Refresh)
            .ok_or_else(|| ApiError::Config("no refresh token stored".to_string()))?;

        let request = ApiRequest::post(REFRESH_PATH).json(&TokenRefreshRequest {
            refresh: &refresh_token,
        })?;
        let response = self.dispatch(&request, None).await?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            let parsed = envelope::parse_error_body(&body);
            return Err(ApiError::Validation {
                status: status.as_u16(),
                message: envelope::extract_message(status.as_u16(), parsed.as_ref()),
                body: parsed,
            });
        }

        let tokens: TokenRefreshResponse = serde_json::from_slice(&body)
            .map_err(|e| ApiError::MalformedResponse(format!("invalid refresh response: {}", e)))?;

        if tokens.access.is_none() && tokens.refresh.is_none() {
            tracing::warn!("refresh response carried no tokens");
        }
        // Renewed values go to both tiers.
        if let Some(access) = &tokens.access {
            self.inner
                .store
                .write(TokenKind::Access, access, &Tier::BOTH)?;
        }
        if let Some(refresh) = &tokens.refresh {
            self.inner
                .store
                .write(TokenKind::Refresh, refresh, &Tier::BOTH)?;
        }
        Ok(())
    }

    /// Clear every stored credential after a terminal auth failure.
    fn terminate_session(&self) {
        if let Err(e) = self.inner.store.clear() {
            tracing::error!(error = %e, "failed to clear credentials after session end");
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal HTTP methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Build a URL for an API path.
    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        let path = path.trim_start_matches('/');
        self.inner.base_url.join(path).map_err(ApiError::from)
    }

    async fn dispatch(&self, request: &ApiRequest, token: Option<&str>) -> Result<reqwest::Response> {
        let url = self.url(&request.path)?;
        tracing::debug!(method = %request.method, %url, authenticated = token.is_some(), "dispatching request");

        let mut builder = self
            .inner
            .http
            .request(request.method.clone(), url)
            .timeout(self.inner.timeout);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        Ok(builder.send().await?)
    }

    /// Handle a response, extracting the payload or error.
    async fn handle_response(&self, response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        if status.is_success() {
            // Some endpoints answer 200/201 with no body at all.
            let body = response.bytes().await.unwrap_or_default();
            return Ok(envelope::parse_success_body(&body));
        }

        let body = response.bytes().await.unwrap_or_default();
        let parsed = envelope::parse_error_body(&body);
        let message = envelope::extract_message(status.as_u16(), parsed.as_ref());
        tracing::debug!(status = status.as_u16(), %message, "request rejected");

        Err(ApiError::Validation {
            status: status.as_u16(),
            message,
            body: parsed,
        })
    }
}

/// Builder for creating a PatrolClient.
#[derive(Debug)]
pub struct ClientBuilder {
    base_url: Option<String>,
    timeout: Duration,
    user_agent: Option<String>,
    store: Option<CredentialStore>,
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
            store: None,
        }
    }

    /// Set the API base URL, e.g. `http://localhost:8000/api`.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Use the given credential store (defaults to an in-memory one).
    pub fn store(mut self, store: CredentialStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<PatrolClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| ApiError::Config("base_url is required".to_string()))?;

        // Parse and normalize base URL
        let mut base_url = Url::parse(&base_url)?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("patrol-client/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(user_agent)
            .build()?;

        Ok(PatrolClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                timeout: self.timeout,
                store: self.store.unwrap_or_else(CredentialStore::in_memory),
                refresh_lock: Mutex::new(()),
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_base_url() {
        let result = ClientBuilder::new().build();
        assert!(matches!(result, Err(ApiError::Config(_))));
    }

    #[test]
    fn test_builder_normalizes_trailing_slash() {
        let client = ClientBuilder::new()
            .base_url("http://localhost:8000/api")
            .build()
            .unwrap();

        assert_eq!(client.base_url().as_str(), "http://localhost:8000/api/");
    }

    #[test]
    fn test_url_building_keeps_base_path() {
        let client = ClientBuilder::new()
            .base_url("http://localhost:8000/api")
            .build()
            .unwrap();

        let url = client.url("/auth/login/").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/auth/login/");

        let url = client.url(REFRESH_PATH).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/auth/token/refresh/");
    }

    #[test]
    fn test_builder_rejects_bad_url() {
        let result = ClientBuilder::new().base_url("not a url").build();
        assert!(matches!(result, Err(ApiError::InvalidUrl(_))));
    }

    #[test]
    fn test_request_json_body() {
        let request = ApiRequest::post("auth/login/")
            .json(&serde_json::json!({"username": "g1"}))
            .unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.body.unwrap()["username"], "g1");
    }
}
