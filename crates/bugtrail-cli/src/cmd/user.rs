//! `bt user`: register and list users.

use super::Context;
use crate::output::render_mode;
use crate::validate;
use bugtrail_core::model::User;
use bugtrail_core::text;
use clap::{Args, Subcommand};

#[derive(Args, Debug)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    #[command(
        about = "Register a user",
        after_help = "EXAMPLES:\n    bt user add alice --name \"Alice Doe\""
    )]
    Add(UserAddArgs),

    #[command(about = "List registered users")]
    List,
}

#[derive(Args, Debug)]
pub struct UserAddArgs {
    /// Handle used with --as and in assignments.
    pub id: String,

    /// Display name.
    #[arg(long)]
    pub name: String,

    /// Avatar image URL.
    #[arg(long)]
    pub image: Option<String>,
}

pub fn run_user(args: &UserArgs, ctx: &Context<'_>) -> anyhow::Result<()> {
    match &args.command {
        UserCommand::Add(add) => run_user_add(add, ctx),
        UserCommand::List => run_user_list(ctx),
    }
}

fn run_user_add(args: &UserAddArgs, ctx: &Context<'_>) -> anyhow::Result<()> {
    validate::validate_user_id(&args.id).map_err(|e| ctx.reject(&e))?;

    let mut tracker = ctx.open()?;
    let user = tracker
        .store_mut()
        .create_user(&User {
            id: args.id.clone(),
            name: args.name.trim().to_string(),
            image: args.image.clone(),
        })
        .map_err(|e| ctx.fail(e))?;

    render_mode(
        ctx.output,
        &user,
        |u, w| writeln!(w, "{}\t{}", u.id, u.name),
        |u, w| writeln!(w, "✓ Registered {} ({})", u.id, u.name),
    )
}

fn run_user_list(ctx: &Context<'_>) -> anyhow::Result<()> {
    let tracker = ctx.open()?;
    let users = tracker.store().list_users().map_err(|e| ctx.fail(e))?;

    render_mode(
        ctx.output,
        &users,
        |users, w| {
            for u in users {
                writeln!(w, "{}\t{}", u.id, u.name)?;
            }
            Ok(())
        },
        |users, w| {
            if users.is_empty() {
                return writeln!(w, "No users registered.");
            }
            for u in users {
                writeln!(w, "[{}] {:<16} {}", text::initials(&u.name), u.id, u.name)?;
            }
            Ok(())
        },
    )
}
