//! HTTP client SDK for the Patrol field-workforce attendance platform.
//!
//! This crate provides the credential side of the client:
//!
//! - [`store`]: two-tier credential storage (ephemeral + durable)
//! - [`client`]: [`PatrolClient`], which attaches bearer tokens and
//!   transparently refreshes and retries on expiry
//! - [`envelope`]: response normalization and error message extraction
//! - [`api`]: typed endpoint groups (auth, users)
//!
//! # Example
//!
//! ```no_run
//! use patrol_client::{CredentialStore, LoginRequest, PatrolClient, Result, Tier};
//!
//! # async fn example() -> Result<()> {
//! let store = CredentialStore::in_memory();
//! let client = PatrolClient::builder()
//!     .base_url("http://localhost:8000/api")
//!     .store(store.clone())
//!     .build()?;
//!
//! let grant = client.auth().login(&LoginRequest::new("g1", "secret")).await?;
//! store.write_credential(&grant.credential, &[Tier::Ephemeral])?;
//!
//! let me = client.auth().profile().await?;
//! println!("Signed in as {} ({})", me.display_name(), me.role);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod envelope;
pub mod error;
pub mod store;
pub mod types;

pub use api::{AuthApi, UsersApi};
pub use client::{ApiRequest, ClientBuilder, PatrolClient};
pub use envelope::Envelope;
pub use error::{ApiError, Result};
pub use store::{CredentialStore, FileTier, MemoryTier, StoreError, Tier, TierBackend, TokenKind};
pub use types::*;
