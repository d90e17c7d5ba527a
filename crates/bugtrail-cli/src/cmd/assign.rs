//! `bt assign` / `bt unassign`: change who works on a bug.
//!
//! Assigning an `UNASSIGNED` bug moves it to `TODO`; reassigning keeps the
//! current status. Unassigning always lands on `UNASSIGNED`.

use super::{Context, render_bug_change};
use crate::validate;
use clap::Args;

#[derive(Args, Debug)]
pub struct AssignArgs {
    /// Bug ID.
    pub id: String,

    /// Project member to assign.
    pub user: String,
}

#[derive(Args, Debug)]
pub struct UnassignArgs {
    /// Bug ID.
    pub id: String,
}

pub fn run_assign(args: &AssignArgs, ctx: &Context<'_>) -> anyhow::Result<()> {
    validate::validate_bug_id(&args.id).map_err(|e| ctx.reject(&e))?;
    validate::validate_user_id(&args.user).map_err(|e| ctx.reject(&e))?;
    apply(&args.id, Some(&args.user), ctx)
}

pub fn run_unassign(args: &UnassignArgs, ctx: &Context<'_>) -> anyhow::Result<()> {
    validate::validate_bug_id(&args.id).map_err(|e| ctx.reject(&e))?;
    apply(&args.id, None, ctx)
}

fn apply(bug_id: &str, assignee: Option<&str>, ctx: &Context<'_>) -> anyhow::Result<()> {
    let actor = ctx.actor()?;
    let mut tracker = ctx.open()?;
    let mut view = ctx.view_for_bug(&tracker, bug_id)?;
    let bug = tracker
        .change_assignment(&mut view, bug_id, assignee, &actor)
        .map_err(|e| ctx.fail(e))?;

    let verb = if assignee.is_some() { "Assigned" } else { "Unassigned" };
    render_bug_change(ctx.output, verb, &bug)
}
