//! `bt comment`: append a comment to a bug's discussion.

use super::Context;
use crate::output::render_mode;
use crate::validate;
use clap::Args;

#[derive(Args, Debug)]
pub struct CommentArgs {
    /// Bug ID.
    pub id: String,

    /// Comment text. Surrounding whitespace is trimmed.
    pub body: String,
}

pub fn run_comment(args: &CommentArgs, ctx: &Context<'_>) -> anyhow::Result<()> {
    validate::validate_bug_id(&args.id).map_err(|e| ctx.reject(&e))?;
    let actor = ctx.actor()?;

    let mut tracker = ctx.open()?;
    let mut view = ctx.view_for_bug(&tracker, &args.id)?;
    let comment = tracker
        .add_comment(&mut view, &args.id, &actor, &args.body)
        .map_err(|e| ctx.fail(e))?;
    let count = view.bug(&args.id).map_or(0, |b| b.comment_count);

    render_mode(
        ctx.output,
        &comment,
        |c, w| writeln!(w, "{}\t{}\t{}", c.id, c.bug_id, c.author_id),
        |c, w| writeln!(w, "✓ Commented on {} ({count} comments)", c.bug_id),
    )
}
