//! CLI command handlers.

pub mod auth;
pub mod config;
pub mod profile;
pub mod users;

use std::io::Write;

use anyhow::{Result, bail};
use patrol_client::{ApiError, Identity};
use patrol_config::LoadedConfig;
use patrol_session::{PatrolContext, SessionState};

use crate::storage;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Resolved configuration, with CLI overrides applied.
    pub loaded: LoadedConfig,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Wire the credential store, client and session for this terminal.
    pub fn open(&self) -> Result<PatrolContext> {
        let ephemeral = storage::ephemeral_tier()?;
        Ok(PatrolContext::open(&self.loaded.config, ephemeral)?)
    }

    /// Open and restore the stored session, failing if nobody is signed in.
    pub async fn signed_in(&self) -> Result<(PatrolContext, Identity)> {
        let patrol = self.open()?;
        match patrol.session().bootstrap().await {
            SessionState::Authenticated(identity) => Ok((patrol, identity)),
            _ => bail!("Not signed in. Run 'patrol login' first."),
        }
    }
}

/// Turn a client error into the message a user should see.
pub fn api_error(err: ApiError) -> anyhow::Error {
    tracing::debug!(error = ?err, "request failed");
    anyhow::anyhow!(err.message())
}

/// Print a value as pretty JSON.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Prompt for a line of input on stdin.
pub fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Prompt for a password without echo.
pub fn prompt_password(label: &str) -> Result<String> {
    Ok(rpassword::prompt_password(label)?)
}

/// Prompt for a new password twice and require both entries to match.
pub fn prompt_new_password() -> Result<(String, String)> {
    let password = prompt_password("New password: ")?;
    if password.is_empty() {
        bail!("Password cannot be empty");
    }
    let confirm = prompt_password("Confirm password: ")?;
    if password != confirm {
        bail!("Passwords do not match");
    }
    Ok((password, confirm))
}
