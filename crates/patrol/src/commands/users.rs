//! Users command - organization user management (admins only).

use anyhow::{Result, bail};
use clap::{Args, Subcommand, ValueEnum};
use console::{Style, style};
use patrol_client::{CreateUserRequest, Identity, ProfileUpdate, Role};
use patrol_session::PatrolContext;

use super::profile::{UpdateArgs, print_identity};
use super::{Context, api_error, print_json, prompt, prompt_new_password};

/// Arguments for the users command.
#[derive(Args, Debug)]
pub struct UsersArgs {
    #[command(subcommand)]
    pub command: UsersCommand,
}

#[derive(Subcommand, Debug)]
pub enum UsersCommand {
    /// List users in your organization
    List,

    /// Show one user
    Show {
        /// User ID
        id: u64,
    },

    /// Create a user (password is prompted)
    Create {
        /// Username
        username: String,

        /// Email address
        #[arg(long)]
        email: String,

        /// Role
        #[arg(long, value_enum, default_value_t = RoleArg::Guard)]
        role: RoleArg,

        /// First name
        #[arg(long)]
        first_name: Option<String>,

        /// Last name
        #[arg(long)]
        last_name: Option<String>,

        /// Phone number
        #[arg(long)]
        phone: Option<String>,
    },

    /// Update a user's details
    Update {
        /// User ID
        id: u64,

        #[command(flatten)]
        fields: UpdateArgs,
    },

    /// Delete a user
    Delete {
        /// User ID
        id: u64,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    Admin,
    Manager,
    Guard,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Admin => Role::Admin,
            RoleArg::Manager => Role::Manager,
            RoleArg::Guard => Role::Guard,
        }
    }
}

/// Run the users command.
pub async fn run(args: UsersArgs, ctx: &Context) -> Result<()> {
    let patrol = admin_session(ctx).await?;

    match args.command {
        UsersCommand::List => cmd_list(&patrol, ctx).await,
        UsersCommand::Show { id } => cmd_show(&patrol, id, ctx).await,
        UsersCommand::Create {
            username,
            email,
            role,
            first_name,
            last_name,
            phone,
        } => {
            let (password, _) = prompt_new_password()?;
            let request = CreateUserRequest {
                username,
                email,
                password,
                role: role.into(),
                first_name,
                last_name,
                phone,
            };
            cmd_create(&patrol, &request, ctx).await
        }
        UsersCommand::Update { id, fields } => cmd_update(&patrol, id, fields.into(), ctx).await,
        UsersCommand::Delete { id, yes } => cmd_delete(&patrol, id, yes, ctx).await,
    }
}

async fn admin_session(ctx: &Context) -> Result<PatrolContext> {
    let (patrol, identity) = ctx.signed_in().await?;
    if !identity.role.can_manage_users() {
        bail!(
            "User management requires the admin role (you are signed in as {})",
            identity.role
        );
    }
    Ok(patrol)
}

async fn cmd_list(patrol: &PatrolContext, ctx: &Context) -> Result<()> {
    let users = patrol.client().users().list().await.map_err(api_error)?;

    if ctx.json_output {
        return print_json(&users);
    }

    if users.is_empty() {
        println!("No users found.");
        return Ok(());
    }

    let dim = Style::new().dim();
    println!(
        "{}",
        style(format!("{:>6}  {:<20} {:<8} {}", "ID", "USERNAME", "ROLE", "NAME")).bold()
    );
    for user in &users {
        println!(
            "{:>6}  {:<20} {:<8} {}",
            user.id,
            user.username,
            user.role.to_string(),
            dim.apply_to(user.display_name())
        );
    }
    println!();
    println!("{}", dim.apply_to(format!("{} user(s)", users.len())));
    Ok(())
}

async fn cmd_show(patrol: &PatrolContext, id: u64, ctx: &Context) -> Result<()> {
    let user = patrol.client().users().get(id).await.map_err(api_error)?;
    print_user(&user, ctx)
}

async fn cmd_create(
    patrol: &PatrolContext,
    request: &CreateUserRequest,
    ctx: &Context,
) -> Result<()> {
    let user = patrol
        .client()
        .users()
        .create(request)
        .await
        .map_err(api_error)?;
    if !ctx.json_output {
        println!("User created.");
    }
    print_user(&user, ctx)
}

async fn cmd_update(
    patrol: &PatrolContext,
    id: u64,
    update: ProfileUpdate,
    ctx: &Context,
) -> Result<()> {
    if update.is_empty() {
        bail!("Nothing to update. Pass at least one of --email, --first-name, --last-name, --phone.");
    }
    let user = patrol
        .client()
        .users()
        .update(id, &update)
        .await
        .map_err(api_error)?;
    if !ctx.json_output {
        println!("User updated.");
    }
    print_user(&user, ctx)
}

async fn cmd_delete(patrol: &PatrolContext, id: u64, yes: bool, ctx: &Context) -> Result<()> {
    if !yes {
        let answer = prompt(&format!("Delete user {}? [y/N] ", id))?;
        if !matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes") {
            println!("Aborted.");
            return Ok(());
        }
    }

    patrol.client().users().delete(id).await.map_err(api_error)?;

    if ctx.json_output {
        return print_json(&serde_json::json!({ "deleted": id }));
    }
    println!("User {} deleted.", id);
    Ok(())
}

fn print_user(user: &Identity, ctx: &Context) -> Result<()> {
    if ctx.json_output {
        return print_json(user);
    }
    print_identity(user);
    Ok(())
}
