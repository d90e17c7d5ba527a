//! `bt sidebar`: navigation summary for the acting user.

use super::Context;
use crate::output::{pretty_section, render_mode};
use bugtrail_core::model::{Project, Sidebar};
use bugtrail_core::text::{self, DEFAULT_SHORTEN_LEN};
use std::io::{self, Write};

pub fn run_sidebar(ctx: &Context<'_>) -> anyhow::Result<()> {
    let actor = ctx.actor()?;
    let tracker = ctx.open()?;
    let sidebar = tracker.store().sidebar(&actor).map_err(|e| ctx.fail(e))?;

    render_mode(
        ctx.output,
        &sidebar,
        |s, w| {
            for p in &s.owned {
                writeln!(w, "owned\t{}\t{}", p.id, p.name)?;
            }
            for p in &s.developing {
                writeln!(w, "developing\t{}\t{}", p.id, p.name)?;
            }
            for b in &s.open_assigned {
                writeln!(w, "assigned\t{}\t{}\t{}", b.id, b.status, b.title)?;
            }
            Ok(())
        },
        write_pretty,
    )
}

fn write_pretty(s: &Sidebar, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "[{}] {} ({})", text::initials(&s.user.name), s.user.name, s.user.id)?;
    writeln!(w)?;
    write_projects(w, "Owned projects", &s.owned)?;
    write_projects(w, "Developing on", &s.developing)?;
    pretty_section(w, "Open bugs assigned to you")?;
    if s.open_assigned.is_empty() {
        writeln!(w, "  (none)")?;
    }
    for b in &s.open_assigned {
        writeln!(
            w,
            "  {:<14} {:<11} {}",
            b.id,
            b.status.label(),
            text::shorten(&b.title, DEFAULT_SHORTEN_LEN)
        )?;
    }
    Ok(())
}

fn write_projects(w: &mut dyn Write, heading: &str, projects: &[Project]) -> io::Result<()> {
    pretty_section(w, heading)?;
    if projects.is_empty() {
        writeln!(w, "  (none)")?;
    }
    for p in projects {
        writeln!(w, "  {:<14} {}", p.id, p.name)?;
    }
    writeln!(w)
}
