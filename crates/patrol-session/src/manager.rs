//! Session manager: bootstrap, login, logout.

use patrol_client::{
    ApiError, ApiRequest, ChangePasswordRequest, Credential, CredentialStore, Identity,
    LoginRequest, PatrolClient, ProfileUpdate, RegisterRequest, Result, StoreError, Tier,
    TokenKind,
};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::state::SessionState;

/// Owns the signed-in identity and drives it through its lifecycle.
///
/// The identity is published on a watch channel; the rest of the
/// application only reads it.
#[derive(Debug)]
pub struct SessionManager {
    client: PatrolClient,
    state: watch::Sender<SessionState>,
}

impl SessionManager {
    /// Create a manager. The state starts as [`SessionState::Bootstrapping`]
    /// until [`bootstrap`](Self::bootstrap), [`login`](Self::login) or
    /// [`logout`](Self::logout) settles it.
    pub fn new(client: PatrolClient) -> Self {
        let (state, _) = watch::channel(SessionState::Bootstrapping);
        Self { client, state }
    }

    pub fn client(&self) -> &PatrolClient {
        &self.client
    }

    fn store(&self) -> &CredentialStore {
        self.client.store()
    }

    /// Current state.
    ///
    /// Reports [`SessionState::Expired`] when an identity is held but the
    /// client has since cleared the credentials behind it.
    pub fn state(&self) -> SessionState {
        let state = self.state.borrow().clone();
        match state {
            SessionState::Authenticated(_) if !self.store().has_credentials() => {
                SessionState::Expired
            }
            other => other,
        }
    }

    /// The signed-in identity, if any.
    pub fn identity(&self) -> Option<Identity> {
        self.state().identity().cloned()
    }

    /// Subscribe to state transitions made by this manager.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Wait until bootstrap (or a login/logout) has settled the identity.
    pub async fn wait_until_known(&self) -> SessionState {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(SessionState::is_known).await;
        self.state()
    }

    fn publish(&self, state: SessionState) {
        self.state.send_replace(state);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Recover or invalidate the stored session at startup.
    ///
    /// - Access token stored: fetch the identity; on failure refresh once
    ///   and fetch again.
    /// - Only a refresh token stored: refresh, then fetch.
    /// - Nothing stored: settle as unauthenticated without network calls.
    ///
    /// Any continued failure clears the stored credentials.
    pub async fn bootstrap(&self) -> SessionState {
        self.publish(SessionState::Bootstrapping);

        let has_access = self.store().read(TokenKind::Access).is_some();
        let has_refresh = self.store().read(TokenKind::Refresh).is_some();

        let identity = if has_access {
            match self.client.auth().profile().await {
                Ok(identity) => Some(identity),
                // Refresh already ran inside the request and failed.
                Err(ApiError::SessionExpired) => None,
                Err(e) => {
                    debug!(error = %e, "profile fetch failed during bootstrap, refreshing");
                    self.refresh_and_fetch().await
                }
            }
        } else if has_refresh {
            self.refresh_and_fetch().await
        } else {
            None
        };

        match identity {
            Some(identity) => {
                info!(user_id = identity.id, role = %identity.role, "session restored");
                self.publish(SessionState::Authenticated(identity));
            }
            None => {
                if has_access || has_refresh {
                    warn!("stored session could not be restored, clearing credentials");
                    self.clear_credentials();
                }
                self.publish(SessionState::Unauthenticated);
            }
        }
        self.state()
    }

    async fn refresh_and_fetch(&self) -> Option<Identity> {
        if let Err(e) = self.client.refresh().await {
            debug!(error = %e, "refresh failed during bootstrap");
            return None;
        }
        match self.client.auth().profile().await {
            Ok(identity) => Some(identity),
            Err(e) => {
                debug!(error = %e, "profile fetch failed after refresh");
                None
            }
        }
    }

    /// Sign in.
    ///
    /// The credential goes to the ephemeral tier always and to the durable
    /// tier too when `remember_me` is set. A rejected or malformed response
    /// leaves stored credentials untouched; its message is available via
    /// [`ApiError::message`]. If storing the new credential fails, every
    /// stored credential is cleared and the store error is returned.
    pub async fn login(&self, credentials: &LoginRequest, remember_me: bool) -> Result<Identity> {
        let grant = match self.client.auth().login(credentials).await {
            Ok(grant) => grant,
            Err(e) => {
                debug!(username = %credentials.username, error = %e, "sign-in rejected");
                return Err(e);
            }
        };

        let tiers: &[Tier] = if remember_me {
            &Tier::BOTH
        } else {
            &[Tier::Ephemeral]
        };
        if let Err(e) = self.persist_grant(&grant.credential, tiers, remember_me) {
            // No partial pair survives a failed sign-in.
            warn!(error = %e, "failed to store credentials, discarding sign-in");
            self.clear_credentials();
            self.publish(SessionState::Unauthenticated);
            return Err(e.into());
        }

        info!(
            user_id = grant.identity.id,
            role = %grant.identity.role,
            remember_me,
            "signed in"
        );
        self.publish(SessionState::Authenticated(grant.identity.clone()));
        Ok(grant.identity)
    }

    /// Sign out: clear every stored credential and drop the identity.
    pub fn logout(&self) {
        self.clear_credentials();
        self.publish(SessionState::Unauthenticated);
        info!("signed out");
    }

    /// Register a new account. Session state is unaffected.
    pub async fn register(&self, user: &RegisterRequest) -> Result<()> {
        self.client.auth().register(user).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Requests on behalf of the application
    // ─────────────────────────────────────────────────────────────────────────

    /// Send a request through the client, dropping the identity if the
    /// request ends the session.
    pub async fn send(&self, request: ApiRequest) -> Result<Value> {
        let result = self.client.send(request).await;
        self.observe(result)
    }

    /// Update the profile and replace the held identity with the result.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Identity> {
        let identity = self.observe(self.client.auth().update_profile(update).await)?;
        let signed_in = self.state.borrow().is_authenticated();
        if signed_in {
            self.publish(SessionState::Authenticated(identity.clone()));
        }
        Ok(identity)
    }

    /// Change the signed-in user's password.
    pub async fn change_password(&self, request: &ChangePasswordRequest) -> Result<String> {
        let result = self.client.auth().change_password(request).await;
        self.observe(result)
    }

    fn observe<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(ApiError::SessionExpired) = &result {
            warn!("session ended by the server, signing out");
            self.publish(SessionState::Unauthenticated);
        }
        result
    }

    fn persist_grant(
        &self,
        credential: &Credential,
        tiers: &[Tier],
        remember_me: bool,
    ) -> std::result::Result<(), StoreError> {
        self.store().write_credential(credential, tiers)?;
        if remember_me {
            self.store().set_remember_me()?;
        }
        Ok(())
    }

    fn clear_credentials(&self) {
        if let Err(e) = self.store().clear() {
            warn!(error = %e, "failed to clear stored credentials");
        }
    }
}
