//! `bt bug`: file, inspect and list bugs.

use super::Context;
use crate::actor;
use crate::output::{OutputMode, pretty_kv, pretty_rule, pretty_section, render_mode};
use crate::validate;
use bugtrail_core::capabilities::{Capabilities, CapabilityStatus, describe_capabilities};
use bugtrail_core::lifecycle::NewBug;
use bugtrail_core::model::{AssignedScope, Bug, BugSummary, Priority, Status};
use bugtrail_core::ordering::{FilterSet, SortCriterion, label_for, sort_bugs};
use bugtrail_core::text::{self, DEFAULT_SHORTEN_LEN};
use bugtrail_core::BugStore;
use clap::{Args, Subcommand};
use serde::Serialize;
use std::io::{self, Write};

/// Title width in list rows.
const LIST_TITLE_LEN: usize = 48;

#[derive(Args, Debug)]
pub struct BugArgs {
    #[command(subcommand)]
    pub command: BugCommand,
}

#[derive(Subcommand, Debug)]
pub enum BugCommand {
    #[command(
        about = "File a bug in a project",
        after_help = "EXAMPLES:\n    bt bug create prj-1a2b3c4d --title \"Refund rounding\" --priority high --assignee bob"
    )]
    Create(BugCreateArgs),

    #[command(about = "Show one bug with its comments")]
    Show(BugShowArgs),

    #[command(
        about = "List a project's bugs",
        after_help = "EXAMPLES:\n    # Open bugs, newest first (default)\n    bt bug list prj-1a2b3c4d\n\n    # Only testing and in-progress, most discussed first\n    bt bug list prj-1a2b3c4d --status testing --status in-progress --sort most-comments\n\n    # Include closed bugs\n    bt bug list prj-1a2b3c4d --all"
    )]
    List(BugListArgs),

    #[command(about = "List bugs assigned to the acting user")]
    Mine(BugMineArgs),
}

#[derive(Args, Debug)]
pub struct BugCreateArgs {
    /// Project ID.
    pub project: String,

    #[arg(long)]
    pub title: String,

    #[arg(long, default_value = "")]
    pub description: String,

    /// critical, high, medium or low.
    #[arg(long, default_value = "medium")]
    pub priority: Priority,

    /// Developer to assign right away.
    #[arg(long)]
    pub assignee: Option<String>,
}

#[derive(Args, Debug)]
pub struct BugShowArgs {
    /// Bug ID.
    pub id: String,
}

#[derive(Args, Debug)]
pub struct BugListArgs {
    /// Project ID.
    pub project: String,

    /// most-comments, least-comments, highest-priority, lowest-priority,
    /// recent or oldest.
    #[arg(long)]
    pub sort: Option<SortCriterion>,

    /// Include only these statuses (repeatable).
    #[arg(long = "status", value_name = "STATUS")]
    pub statuses: Vec<Status>,

    /// Include only these priorities (repeatable).
    #[arg(long = "priority", value_name = "PRIORITY")]
    pub priorities: Vec<Priority>,

    /// Start from every status, closed included.
    #[arg(long)]
    pub all: bool,
}

#[derive(Args, Debug)]
pub struct BugMineArgs {
    /// Include closed bugs.
    #[arg(long)]
    pub all: bool,

    #[arg(long)]
    pub sort: Option<SortCriterion>,
}

#[derive(Debug, Serialize)]
struct BugDetail {
    #[serde(flatten)]
    bug: Bug,
    #[serde(skip_serializing_if = "Option::is_none")]
    capabilities: Option<Vec<CapabilityStatus>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    allowed_statuses: Option<Vec<Status>>,
}

#[derive(Debug, Serialize)]
struct BugList {
    sort: SortCriterion,
    statuses: Vec<Status>,
    priorities: Vec<Priority>,
    bugs: Vec<BugSummary>,
}

pub fn run_bug(args: &BugArgs, ctx: &Context<'_>) -> anyhow::Result<()> {
    match &args.command {
        BugCommand::Create(a) => run_create(a, ctx),
        BugCommand::Show(a) => run_show(a, ctx),
        BugCommand::List(a) => run_list(a, ctx),
        BugCommand::Mine(a) => run_mine(a, ctx),
    }
}

fn run_create(args: &BugCreateArgs, ctx: &Context<'_>) -> anyhow::Result<()> {
    validate::validate_project_id(&args.project).map_err(|e| ctx.reject(&e))?;
    if let Some(assignee) = &args.assignee {
        validate::validate_user_id(assignee).map_err(|e| ctx.reject(&e))?;
    }
    let actor = ctx.actor()?;

    let mut tracker = ctx.open()?;
    let mut view = tracker
        .load_view(&args.project, &ctx.config.tracker.view)
        .map_err(|e| ctx.fail(e))?;
    let new = NewBug {
        title: args.title.clone(),
        description: args.description.clone(),
        priority: args.priority,
        project_id: args.project.clone(),
        reporter_id: actor,
        assignee_id: args.assignee.clone(),
    };
    let bug = tracker
        .create_bug(&mut view, &new)
        .map_err(|e| ctx.fail(e))?;

    render_mode(
        ctx.output,
        &bug,
        |b, w| writeln!(w, "{}\t{}\t{}\t{}", b.id, b.status, b.priority, b.title),
        |b, w| writeln!(w, "✓ Filed {} [{}] {}", b.id, b.status.label(), b.title),
    )
}

fn run_show(args: &BugShowArgs, ctx: &Context<'_>) -> anyhow::Result<()> {
    validate::validate_bug_id(&args.id).map_err(|e| ctx.reject(&e))?;
    // Capabilities are shown only when an acting user is known.
    let actor = actor::require_actor(ctx.as_user, ctx.config.user.user.as_deref()).ok();

    let tracker = ctx.open()?;
    let store = tracker.store();
    let bug = store.fetch_bug(&args.id).map_err(|e| ctx.fail(e))?;
    let caps = match &actor {
        Some(actor) => {
            let project = store
                .fetch_project(&bug.project_id)
                .map_err(|e| ctx.fail(e))?;
            Some(Capabilities::for_actor(actor, &bug, &project))
        }
        None => None,
    };

    let detail = BugDetail {
        capabilities: caps.as_ref().map(describe_capabilities),
        allowed_statuses: caps.as_ref().map(Capabilities::allowed_statuses),
        bug,
    };

    render_mode(
        ctx.output,
        &detail,
        |d, w| {
            let b = &d.bug;
            writeln!(
                w,
                "{}\t{}\t{}\t{}\t{}\t{}",
                b.id,
                b.status,
                b.priority,
                b.assignee_id.as_deref().unwrap_or("-"),
                b.comments.len(),
                b.title
            )
        },
        |d, w| write_bug_detail(w, d),
    )
}

fn write_bug_detail(w: &mut dyn Write, d: &BugDetail) -> io::Result<()> {
    let b = &d.bug;
    pretty_section(w, &format!("{}  {}", b.id, b.title))?;
    pretty_kv(w, "status", b.status.label())?;
    pretty_kv(w, "priority", b.priority.label())?;
    pretty_kv(w, "reporter", &b.reporter_id)?;
    pretty_kv(w, "assignee", b.assignee_id.as_deref().unwrap_or("(unassigned)"))?;
    pretty_kv(w, "project", &b.project_id)?;
    pretty_kv(w, "created", b.created_at.to_rfc3339())?;
    pretty_kv(w, "updated", b.updated_at.to_rfc3339())?;
    if !b.description.is_empty() {
        writeln!(w)?;
        writeln!(w, "{}", b.description)?;
    }
    if let Some(caps) = &d.capabilities {
        writeln!(w)?;
        pretty_section(w, "You may")?;
        for cap in caps {
            let mark = if cap.available { "✓" } else { "✗" };
            writeln!(w, "  {mark} {:<16} {}", cap.name, cap.requires)?;
        }
    }
    writeln!(w)?;
    pretty_section(w, &format!("Comments ({})", b.comments.len()))?;
    for c in &b.comments {
        writeln!(w, "[{}] {}", c.author_id, c.created_at.format("%Y-%m-%d %H:%M"))?;
        writeln!(w, "  {}", c.body)?;
    }
    pretty_rule(w)
}

fn run_list(args: &BugListArgs, ctx: &Context<'_>) -> anyhow::Result<()> {
    validate::validate_project_id(&args.project).map_err(|e| ctx.reject(&e))?;
    let tracker = ctx.open()?;
    let mut view = tracker
        .load_view(&args.project, &ctx.config.tracker.view)
        .map_err(|e| ctx.fail(e))?;

    if args.all {
        view.filters = FilterSet::all();
    }
    if !args.statuses.is_empty() {
        view.filters.statuses = args.statuses.iter().copied().collect();
    }
    if !args.priorities.is_empty() {
        view.filters.priorities = args.priorities.iter().copied().collect();
    }
    if let Some(sort) = args.sort {
        view.sort = sort;
    }

    let (statuses, priorities) = selection(&view.filters);
    let list = BugList {
        sort: view.sort,
        statuses,
        priorities,
        bugs: view.visible().into_iter().cloned().collect(),
    };
    tracing::debug!(project = %args.project, rows = list.bugs.len(), sort = %list.sort, "bug list");

    render_list(ctx.output, &list, &view.project.name)
}

fn run_mine(args: &BugMineArgs, ctx: &Context<'_>) -> anyhow::Result<()> {
    let actor = ctx.actor()?;
    let tracker = ctx.open()?;
    let scope = if args.all {
        AssignedScope::All
    } else {
        AssignedScope::Open
    };
    let bugs = tracker
        .store()
        .list_assigned_bugs(&actor, scope)
        .map_err(|e| ctx.fail(e))?;
    let sort = args.sort.unwrap_or(ctx.config.tracker.view.default_sort);

    let filters = if args.all {
        FilterSet::all()
    } else {
        FilterSet::default()
    };
    let (statuses, priorities) = selection(&filters);
    let list = BugList {
        sort,
        statuses,
        priorities,
        bugs: sort_bugs(&bugs, sort),
    };
    render_list(ctx.output, &list, &format!("Assigned to {actor}"))
}

/// Included statuses and priorities in display order.
fn selection(filters: &FilterSet) -> (Vec<Status>, Vec<Priority>) {
    (
        Status::ALL
            .into_iter()
            .filter(|s| filters.includes_status(*s))
            .collect(),
        Priority::ALL
            .into_iter()
            .filter(|p| filters.includes_priority(*p))
            .collect(),
    )
}

fn render_list(output: OutputMode, list: &BugList, heading: &str) -> anyhow::Result<()> {
    render_mode(
        output,
        list,
        |l, w| {
            for b in &l.bugs {
                write_row(w, b, DEFAULT_SHORTEN_LEN)?;
            }
            Ok(())
        },
        |l, w| {
            pretty_section(w, &format!("{heading}  (sorted: {})", label_for(l.sort)))?;
            if l.bugs.is_empty() {
                return writeln!(w, "No bugs match the current filters.");
            }
            for b in &l.bugs {
                write_row(w, b, LIST_TITLE_LEN)?;
            }
            Ok(())
        },
    )
}

fn write_row(w: &mut dyn Write, b: &BugSummary, title_len: usize) -> io::Result<()> {
    writeln!(
        w,
        "{}\t{}\t{}\t{}\t{}\t{}",
        b.id,
        b.status,
        b.priority,
        b.assignee_id.as_deref().unwrap_or("-"),
        b.comment_count,
        text::shorten(&b.title, title_len)
    )
}
