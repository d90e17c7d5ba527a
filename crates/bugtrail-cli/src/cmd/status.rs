//! `bt status`: move a bug through its lifecycle.

use super::{Context, render_bug_change};
use crate::validate;
use bugtrail_core::model::Status;
use clap::Args;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Bug ID.
    pub id: String,

    /// unassigned, todo, in-progress, testing or closed.
    pub status: Status,
}

/// Only the assignee or the project owner may change status, and only the
/// owner may close. Setting `unassigned` also clears the assignee.
pub fn run_status(args: &StatusArgs, ctx: &Context<'_>) -> anyhow::Result<()> {
    validate::validate_bug_id(&args.id).map_err(|e| ctx.reject(&e))?;
    let actor = ctx.actor()?;

    let mut tracker = ctx.open()?;
    let mut view = ctx.view_for_bug(&tracker, &args.id)?;
    let bug = tracker
        .change_status(&mut view, &args.id, args.status, &actor)
        .map_err(|e| ctx.fail(e))?;

    render_bug_change(ctx.output, "Status set on", &bug)
}
