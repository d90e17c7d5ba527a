use super::{Context, render_bug_change};
use crate::validate;
use bugtrail_core::model::Priority;
use clap::Args;

#[derive(Args, Debug)]
pub struct PriorityArgs {
    /// Bug ID.
    pub id: String,

    /// critical, high, medium or low.
    pub priority: Priority,
}

pub fn run_priority(args: &PriorityArgs, ctx: &Context<'_>) -> anyhow::Result<()> {
    validate::validate_bug_id(&args.id).map_err(|e| ctx.reject(&e))?;
    let actor = ctx.actor()?;

    let mut tracker = ctx.open()?;
    let mut view = ctx.view_for_bug(&tracker, &args.id)?;
    let bug = tracker
        .change_priority(&mut view, &args.id, args.priority, &actor)
        .map_err(|e| ctx.fail(e))?;

    render_bug_change(ctx.output, "Priority set on", &bug)
}
