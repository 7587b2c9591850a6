//! Auth API: sign-in, registration, profile and password.

use tracing::debug;

use crate::client::{ApiRequest, PatrolClient};
use crate::envelope::decode;
use crate::error::{ApiError, Result};
use crate::types::{
    ChangePasswordRequest, Identity, LoginGrant, LoginRequest, LoginResponse, MessageResponse,
    ProfileUpdate, RegisterRequest,
};

/// Sign-in endpoint.
pub const LOGIN_PATH: &str = "auth/login/";

/// Self-service registration endpoint.
pub const REGISTER_PATH: &str = "auth/register/";

/// Current identity endpoint (GET to fetch, PUT to update).
pub const PROFILE_PATH: &str = "auth/profile/";

/// Password change endpoint.
pub const CHANGE_PASSWORD_PATH: &str = "auth/change-password/";

/// Auth API client.
pub struct AuthApi {
    client: PatrolClient,
}

impl AuthApi {
    pub(crate) fn new(client: PatrolClient) -> Self {
        Self { client }
    }

    /// Exchange username/password for an identity and credential.
    ///
    /// Does not touch the credential store; persisting the grant is the
    /// session layer's decision.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<LoginGrant> {
        let payload = self
            .client
            .send_anonymous(ApiRequest::post(LOGIN_PATH).json(credentials)?)
            .await?;
        let response: LoginResponse = serde_json::from_value(payload)
            .map_err(|_| ApiError::MalformedResponse("Login failed".to_string()))?;
        response.into_grant()
    }

    /// Register a new account. Does not sign in.
    pub async fn register(&self, request: &RegisterRequest) -> Result<()> {
        let payload = self
            .client
            .send_anonymous(ApiRequest::post(REGISTER_PATH).json(request)?)
            .await?;

        if payload.get("success").and_then(|v| v.as_bool()) == Some(false) {
            let message = ["error", "message"]
                .iter()
                .find_map(|key| payload.get(*key).and_then(|v| v.as_str()))
                .unwrap_or("Registration failed");
            return Err(ApiError::Validation {
                status: 200,
                message: message.to_string(),
                body: Some(payload),
            });
        }

        debug!(username = %request.username, "registration accepted");
        Ok(())
    }

    /// Fetch the identity behind the current credential.
    pub async fn profile(&self) -> Result<Identity> {
        self.client.get(PROFILE_PATH).await
    }

    /// Update the current user's profile, returning the new record.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Identity> {
        self.client.put(PROFILE_PATH, update).await
    }

    /// Change the current user's password. Returns the server's message.
    pub async fn change_password(&self, request: &ChangePasswordRequest) -> Result<String> {
        let payload = self
            .client
            .send(ApiRequest::post(CHANGE_PASSWORD_PATH).json(request)?)
            .await?;
        let response: MessageResponse = decode(payload)?;
        Ok(response
            .message
            .unwrap_or_else(|| "Password changed successfully".to_string()))
    }
}
