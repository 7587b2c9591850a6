//! Ephemeral credential tier for the CLI.
//!
//! A browser tab's session storage has no direct terminal equivalent; the
//! closest is a file in the temp directory keyed to the invoking shell. It
//! survives between commands typed in one terminal and is not shared with
//! other terminals.

use std::path::PathBuf;
use std::sync::Arc;

use patrol_client::{FileTier, StoreError, TierBackend};

/// Environment variable overriding the terminal session id.
pub const SESSION_ID_ENV: &str = "PATROL_SESSION_ID";

/// Identify the current terminal session.
///
/// `PATROL_SESSION_ID` if set, else the parent process (the shell).
pub fn session_id() -> String {
    match std::env::var(SESSION_ID_ENV) {
        Ok(id) if !id.trim().is_empty() => id,
        _ => parent_process_id(),
    }
}

#[cfg(unix)]
fn parent_process_id() -> String {
    std::os::unix::process::parent_id().to_string()
}

#[cfg(not(unix))]
fn parent_process_id() -> String {
    "default".to_string()
}

/// File name for a session id, reduced to characters safe in a path.
pub fn session_file_name(id: &str) -> String {
    let safe: String = id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    let safe = if safe.is_empty() { "default" } else { &safe };
    format!("patrol-session-{}.json", safe)
}

/// Location of the ephemeral tier for this terminal session.
pub fn ephemeral_path() -> PathBuf {
    std::env::temp_dir().join(session_file_name(&session_id()))
}

/// Open the ephemeral tier for this terminal session.
pub fn ephemeral_tier() -> Result<Arc<dyn TierBackend>, StoreError> {
    let path = ephemeral_path();
    tracing::debug!(path = %path.display(), "ephemeral credential tier");
    Ok(Arc::new(FileTier::open(path)?))
}
