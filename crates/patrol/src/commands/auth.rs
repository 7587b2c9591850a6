//! Sign-in commands: login, logout, status, register, passwd.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use patrol_client::{ChangePasswordRequest, Identity, LoginRequest, RegisterRequest};
use serde::Serialize;

use super::{Context, api_error, print_json, prompt, prompt_new_password, prompt_password};

/// Arguments for the login command.
#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Username (prompted if omitted)
    pub username: Option<String>,

    /// Stay signed in after this terminal is closed
    #[arg(short, long)]
    pub remember: bool,
}

/// Arguments for the register command.
#[derive(Args, Debug)]
pub struct RegisterArgs {
    /// Username for the new account
    pub username: String,

    /// Email address
    #[arg(long)]
    pub email: String,

    /// Organization name
    #[arg(long)]
    pub organization: Option<String>,

    /// First name
    #[arg(long)]
    pub first_name: Option<String>,

    /// Last name
    #[arg(long)]
    pub last_name: Option<String>,

    /// Phone number
    #[arg(long)]
    pub phone: Option<String>,
}

/// Status response for JSON output.
#[derive(Debug, Serialize)]
struct StatusOutput<'a> {
    authenticated: bool,
    server_url: &'a str,
    user: Option<&'a Identity>,
}

pub async fn login(args: LoginArgs, ctx: &Context) -> Result<()> {
    let username = match args.username {
        Some(username) => username,
        None => prompt("Username: ")?,
    };
    let password = prompt_password("Password: ")?;

    let patrol = ctx.open()?;
    let identity = patrol
        .session()
        .login(&LoginRequest::new(username, password), args.remember)
        .await
        .map_err(api_error)?;

    if ctx.json_output {
        return print_json(&identity);
    }

    println!(
        "Signed in as {} ({})",
        style(identity.display_name()).bold(),
        identity.role
    );
    if !args.remember {
        println!(
            "{}",
            Style::new()
                .dim()
                .apply_to("Session ends with this terminal. Use --remember to stay signed in.")
        );
    }
    Ok(())
}

pub async fn logout(ctx: &Context) -> Result<()> {
    let patrol = ctx.open()?;
    patrol.session().logout();

    if ctx.json_output {
        return print_json(&serde_json::json!({ "signed_out": true }));
    }
    println!("Signed out.");
    Ok(())
}

pub async fn status(ctx: &Context) -> Result<()> {
    let patrol = ctx.open()?;
    let state = patrol.session().bootstrap().await;
    let identity = state.identity();
    let server_url = patrol.client().base_url().as_str();

    if ctx.json_output {
        return print_json(&StatusOutput {
            authenticated: identity.is_some(),
            server_url,
            user: identity,
        });
    }

    let dim = Style::new().dim();
    println!();
    println!("{}", style("Patrol Session").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!();
    match identity {
        Some(identity) => {
            println!(
                "  {} {}",
                dim.apply_to("Status:"),
                Style::new().green().apply_to("● signed in")
            );
            println!("  {} {}", dim.apply_to("User:"), identity.display_name());
            println!("  {} {}", dim.apply_to("Username:"), identity.username);
            println!("  {} {}", dim.apply_to("Role:"), identity.role);
            if let Some(org) = &identity.organization {
                println!("  {} {}", dim.apply_to("Organization:"), org.name);
            }
            if ctx.verbose {
                let remembered = patrol.store().remember_me();
                println!("  {} {}", dim.apply_to("Remembered:"), remembered);
            }
        }
        None => {
            println!(
                "  {} {}",
                dim.apply_to("Status:"),
                Style::new().red().apply_to("○ signed out")
            );
            println!();
            println!("  Run 'patrol login' to sign in.");
        }
    }
    println!("  {} {}", dim.apply_to("Server:"), server_url);
    println!();
    Ok(())
}

pub async fn register(args: RegisterArgs, ctx: &Context) -> Result<()> {
    let (password, _) = prompt_new_password()?;
    let request = RegisterRequest {
        username: args.username,
        email: args.email,
        password,
        first_name: args.first_name,
        last_name: args.last_name,
        phone: args.phone,
        organization_name: args.organization,
    };

    let patrol = ctx.open()?;
    patrol
        .session()
        .register(&request)
        .await
        .map_err(api_error)?;

    if ctx.json_output {
        return print_json(&serde_json::json!({ "registered": true }));
    }
    println!("Account created. Run 'patrol login {}' to sign in.", request.username);
    Ok(())
}

pub async fn passwd(ctx: &Context) -> Result<()> {
    let (patrol, _) = ctx.signed_in().await?;

    let current_password = prompt_password("Current password: ")?;
    let (new_password, confirm_password) = prompt_new_password()?;
    let message = patrol
        .session()
        .change_password(&ChangePasswordRequest {
            current_password,
            new_password,
            confirm_password,
        })
        .await
        .map_err(api_error)?;

    if ctx.json_output {
        return print_json(&serde_json::json!({ "message": message }));
    }
    println!("{}", message);
    Ok(())
}
