//! Session lifecycle for the Patrol client.
//!
//! This crate sits on top of [`patrol_client`] and owns the signed-in
//! identity:
//! - [`SessionManager`] bootstraps a session from stored credentials, signs
//!   in and out, and publishes [`SessionState`] changes
//! - [`PatrolContext`] wires store, client and session together so the
//!   application receives one explicitly constructed object
//!
//! # Example
//!
//! ```rust,ignore
//! use patrol_session::{PatrolContext, SessionState};
//!
//! let ctx = PatrolContext::new(client);
//! match ctx.session().bootstrap().await {
//!     SessionState::Authenticated(me) => println!("welcome back, {}", me.display_name()),
//!     _ => println!("please sign in"),
//! }
//! ```

mod context;
mod error;
mod manager;
mod state;

pub use context::PatrolContext;
pub use error::{Error, Result};
pub use manager::SessionManager;
pub use state::SessionState;
