//! Profile command - view and edit the signed-in user's profile.

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use console::{Style, style};
use patrol_client::{Identity, ProfileUpdate};

use super::{Context, api_error, print_json};

/// Arguments for the profile command.
#[derive(Args, Debug)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub command: Option<ProfileCommand>,
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// Show your profile (default)
    Show,

    /// Update fields of your profile
    Update(UpdateArgs),
}

/// Editable profile fields. Omitted fields are left unchanged.
#[derive(Args, Debug, Default)]
pub struct UpdateArgs {
    /// Email address
    #[arg(long)]
    pub email: Option<String>,

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

impl From<UpdateArgs> for ProfileUpdate {
    fn from(args: UpdateArgs) -> Self {
        ProfileUpdate {
            email: args.email,
            first_name: args.first_name,
            last_name: args.last_name,
            phone: args.phone,
        }
    }
}

/// Run the profile command.
pub async fn run(args: ProfileArgs, ctx: &Context) -> Result<()> {
    match args.command.unwrap_or(ProfileCommand::Show) {
        ProfileCommand::Show => cmd_show(ctx).await,
        ProfileCommand::Update(update) => cmd_update(update.into(), ctx).await,
    }
}

async fn cmd_show(ctx: &Context) -> Result<()> {
    let (_, identity) = ctx.signed_in().await?;
    if ctx.json_output {
        return print_json(&identity);
    }
    print_identity(&identity);
    Ok(())
}

async fn cmd_update(update: ProfileUpdate, ctx: &Context) -> Result<()> {
    if update.is_empty() {
        bail!("Nothing to update. Pass at least one of --email, --first-name, --last-name, --phone.");
    }

    let (patrol, _) = ctx.signed_in().await?;
    let identity = patrol
        .session()
        .update_profile(&update)
        .await
        .map_err(api_error)?;

    if ctx.json_output {
        return print_json(&identity);
    }
    println!("Profile updated.");
    print_identity(&identity);
    Ok(())
}

/// Render an identity as a labelled block.
pub fn print_identity(identity: &Identity) {
    let dim = Style::new().dim();
    let none = || dim.apply_to("-").to_string();

    println!();
    println!("{}", style(identity.display_name()).bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!("  {} {}", dim.apply_to("ID:"), identity.id);
    println!("  {} {}", dim.apply_to("Username:"), identity.username);
    println!("  {} {}", dim.apply_to("Role:"), identity.role);
    println!(
        "  {} {}",
        dim.apply_to("Email:"),
        identity.email.clone().unwrap_or_else(none)
    );
    println!(
        "  {} {}",
        dim.apply_to("Phone:"),
        identity.phone.clone().unwrap_or_else(none)
    );
    if let Some(org) = &identity.organization {
        match &org.plan {
            Some(plan) => println!("  {} {} ({})", dim.apply_to("Organization:"), org.name, plan),
            None => println!("  {} {}", dim.apply_to("Organization:"), org.name),
        }
    }
    if let Some(created) = identity.created_at {
        println!(
            "  {} {}",
            dim.apply_to("Member since:"),
            created.format("%Y-%m-%d")
        );
    }
    println!();
}
