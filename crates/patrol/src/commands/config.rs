//! Config command - configuration management.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use patrol_client::store::CREDENTIAL_FILE;
use patrol_config::PatrolConfig;
use serde::Serialize;

use super::{Context, print_json};

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration
    Show,

    /// Show which config files are loaded and their precedence
    Which,

    /// Save the API base URL to a config file
    SetServer {
        /// API base URL (e.g., https://patrol.example.com/api)
        url: String,

        /// Write project-local config (./patrol.toml) instead of user config
        #[arg(long)]
        local: bool,
    },

    /// Show configuration file path
    Path,
}

/// Resolved settings for JSON output.
#[derive(Debug, Serialize)]
struct ResolvedConfig<'a> {
    server_url: &'a str,
    timeout_secs: u64,
    user_agent: Option<&'a str>,
    data_dir: Option<PathBuf>,
    sources: Vec<&'a std::path::Path>,
    warnings: &'a [String],
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx).await,
        ConfigCommand::Which => cmd_which(ctx).await,
        ConfigCommand::SetServer { url, local } => cmd_set_server(&url, local).await,
        ConfigCommand::Path => cmd_path().await,
    }
}

async fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = &ctx.loaded;
    let config = &loaded.config;

    if ctx.json_output {
        return print_json(&ResolvedConfig {
            server_url: config.server_url(),
            timeout_secs: config.timeout().as_secs(),
            user_agent: config.user_agent(),
            data_dir: config.data_dir(),
            sources: loaded.loaded_from(),
            warnings: &loaded.warnings,
        });
    }

    let sources = loaded.loaded_from();
    if sources.is_empty() {
        println!("Using built-in defaults (no config files found)\n");
    } else {
        for source in &sources {
            println!("from {}", source.display());
        }
        println!();
    }

    println!("Server:");
    println!("  url: {}", config.server_url());
    println!("  timeout: {}s", config.timeout().as_secs());
    if let Some(agent) = config.user_agent() {
        println!("  user agent: {}", agent);
    }
    println!();

    println!("Storage:");
    match config.data_dir() {
        Some(dir) => println!("  credentials: {}", dir.join(CREDENTIAL_FILE).display()),
        None => println!("  credentials: (no data directory available)"),
    }
    println!("  session: {}", crate::storage::ephemeral_path().display());
    println!();

    for warning in &loaded.warnings {
        println!("⚠ {}", warning);
    }

    if ctx.verbose {
        println!("\n# merged file layers");
        println!("{}", config.to_toml()?);
    }

    Ok(())
}

async fn cmd_which(ctx: &Context) -> Result<()> {
    let loaded = &ctx.loaded;

    if ctx.json_output {
        let sources: Vec<_> = loaded
            .sources
            .iter()
            .map(|s| {
                serde_json::json!({
                    "layer": s.layer.to_string(),
                    "path": s.path,
                    "loaded": s.loaded,
                })
            })
            .collect();
        return print_json(&sources);
    }

    println!("Lookup order, lowest precedence first:\n");
    for source in &loaded.sources {
        let mark = if source.loaded { "✓" } else { "·" };
        println!("  {} {:<8} {}", mark, source.layer, source.path.display());
    }
    println!("  {} {:<8} --server / PATROL_SERVER_URL", "·", "flag");
    println!();

    match loaded.loaded_from().len() {
        0 => println!("No config files found. Run 'patrol config set-server <url>' to create one."),
        n => println!("{} file(s) in effect.", n),
    }
    Ok(())
}

async fn cmd_set_server(url: &str, local: bool) -> Result<()> {
    url::Url::parse(url).map_err(|e| anyhow::anyhow!("Invalid server URL '{}': {}", url, e))?;

    let path = if local {
        PathBuf::from("patrol.toml")
    } else {
        patrol_config::xdg_config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
    };

    let mut config = if path.exists() {
        patrol_config::load_config_file(&path)?
    } else {
        PatrolConfig::new()
    };
    config.set_server_url(url);
    patrol_config::save_config(&config, &path)?;

    println!("Server set to {} in {}", url, path.display());
    Ok(())
}

async fn cmd_path() -> Result<()> {
    if let Some(path) = patrol_config::xdg_config_path() {
        println!("{}", path.display());
    } else {
        eprintln!("Could not determine config directory");
    }
    Ok(())
}
