//! Patrol - command-line client for the guard patrol management backend
//!
//! Main entry point for the Patrol CLI.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod storage;

use commands::{auth, config, profile, users};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Patrol - sign in and manage your guard patrol account
#[derive(Parser)]
#[command(name = "patrol")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// API base URL (default: http://localhost:8000/api)
    #[arg(long, global = true, env = "PATROL_SERVER_URL")]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in
    Login(auth::LoginArgs),

    /// Sign out and forget stored credentials
    Logout,

    /// Show who is signed in
    Status,

    /// Create a new organization account
    Register(auth::RegisterArgs),

    /// Change your password
    Passwd,

    /// View or edit your profile
    Profile(profile::ProfileArgs),

    /// Manage users in your organization (admins only)
    Users(users::UsersArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console (human-readable, stderr) + rotating JSON file
    let filter = if cli.verbose {
        "patrol=debug,patrol_client=debug,patrol_session=debug,patrol_config=debug,info"
    } else {
        "patrol=info,patrol_client=warn,patrol_session=warn,patrol_config=warn,warn"
    };

    let log_dir = patrol_config::xdg_config_dir()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| std::path::PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "patrol.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "patrol=trace,patrol_client=trace,patrol_session=trace,patrol_config=trace,info",
                )),
        )
        .init();

    let mut loaded = patrol_config::load_config(None)?;
    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }
    if let Some(server) = cli.server {
        loaded.config.set_server_url(server);
    }

    let ctx = commands::Context {
        loaded,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Login(args) => auth::login(args, &ctx).await,
        Commands::Logout => auth::logout(&ctx).await,
        Commands::Status => auth::status(&ctx).await,
        Commands::Register(args) => auth::register(args, &ctx).await,
        Commands::Passwd => auth::passwd(&ctx).await,
        Commands::Profile(args) => profile::run(args, &ctx).await,
        Commands::Users(args) => users::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
