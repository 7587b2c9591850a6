//! Error types for assembling a session context.

use patrol_client::{ApiError, StoreError};

/// Error type for context construction.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No directory is available for the durable credential tier.
    #[error("Could not determine a data directory for stored credentials")]
    NoDataDir,

    /// The durable tier could not be opened.
    #[error("Credential store error: {0}")]
    Store(#[from] StoreError),

    /// The HTTP client could not be built.
    #[error("Client error: {0}")]
    Client(#[from] ApiError),
}

/// Result type for context construction.
pub type Result<T> = std::result::Result<T, Error>;
