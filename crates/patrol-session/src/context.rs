//! Application context wiring store, client and session together.

use std::sync::Arc;

use patrol_client::{CredentialStore, FileTier, PatrolClient, TierBackend};
use patrol_config::PatrolConfig;

use crate::error::{Error, Result};
use crate::manager::SessionManager;

/// The object handed to every consumer in place of global state.
///
/// Cloning is cheap; clones share the same client, store and session.
#[derive(Debug, Clone)]
pub struct PatrolContext {
    client: PatrolClient,
    session: Arc<SessionManager>,
}

impl PatrolContext {
    /// Wrap an already-built client.
    pub fn new(client: PatrolClient) -> Self {
        let session = Arc::new(SessionManager::new(client.clone()));
        Self { client, session }
    }

    /// Build a client from configuration over the given store.
    pub fn from_config(config: &PatrolConfig, store: CredentialStore) -> Result<Self> {
        let mut builder = PatrolClient::builder()
            .base_url(config.server_url())
            .timeout(config.timeout())
            .store(store);
        if let Some(agent) = config.user_agent() {
            builder = builder.user_agent(agent);
        }
        Ok(Self::new(builder.build()?))
    }

    /// Build from configuration with the durable tier in the configured
    /// data directory and the caller's choice of ephemeral tier.
    pub fn open(config: &PatrolConfig, ephemeral: Arc<dyn TierBackend>) -> Result<Self> {
        let data_dir = config.data_dir().ok_or(Error::NoDataDir)?;
        let durable = FileTier::in_dir(&data_dir)?;
        tracing::debug!(path = %durable.path().display(), "durable credential tier opened");

        let store = CredentialStore::new(ephemeral, Arc::new(durable));
        Self::from_config(config, store)
    }

    pub fn client(&self) -> &PatrolClient {
        &self.client
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn store(&self) -> &CredentialStore {
        self.client.store()
    }
}
