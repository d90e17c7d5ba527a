//! `bt project`: create, inspect and delete projects and their rosters.

use super::Context;
use crate::output::{pretty_kv, pretty_rule, pretty_section, render, render_mode};
use crate::validate;
use bugtrail_core::lifecycle;
use bugtrail_core::model::{Project, ProjectScope, User};
use bugtrail_core::ordering::sort_projects_by_recency;
use bugtrail_core::{BugStore, TrackerError};
use clap::{Args, Subcommand, ValueEnum};
use serde::Serialize;

#[derive(Args, Debug)]
pub struct ProjectArgs {
    #[command(subcommand)]
    pub command: ProjectCommand,
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    #[command(
        about = "Create a project owned by the acting user",
        after_help = "EXAMPLES:\n    bt --as alice project create \"Payments\" --dev bob --dev carol"
    )]
    Create(ProjectCreateArgs),

    #[command(about = "List projects the acting user owns or develops on")]
    List(ProjectListArgs),

    #[command(about = "Show a project with its roster")]
    Show(ProjectIdArgs),

    #[command(
        about = "Delete a project with all its bugs and comments",
        after_help = "EXAMPLES:\n    bt --as alice project delete prj-1a2b3c4d --confirm \"Payments\""
    )]
    Delete(ProjectDeleteArgs),

    #[command(about = "Add a developer to a project (owner only)")]
    AddDev(ProjectAddDevArgs),

    #[command(about = "List a project's developers")]
    Developers(ProjectIdArgs),
}

#[derive(Args, Debug)]
pub struct ProjectCreateArgs {
    /// Project name.
    pub name: String,

    /// Initial developer (repeatable).
    #[arg(long = "dev", value_name = "USER")]
    pub developers: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum ScopeArg {
    Owner,
    Developer,
    #[default]
    All,
}

impl From<ScopeArg> for ProjectScope {
    fn from(value: ScopeArg) -> Self {
        match value {
            ScopeArg::Owner => Self::Owner,
            ScopeArg::Developer => Self::Developer,
            ScopeArg::All => Self::All,
        }
    }
}

#[derive(Args, Debug)]
pub struct ProjectListArgs {
    /// Which role to list projects for.
    #[arg(long, value_enum, default_value_t = ScopeArg::All)]
    pub scope: ScopeArg,
}

#[derive(Args, Debug)]
pub struct ProjectIdArgs {
    /// Project ID.
    pub id: String,
}

#[derive(Args, Debug)]
pub struct ProjectDeleteArgs {
    /// Project ID.
    pub id: String,

    /// The project name, typed out to confirm.
    #[arg(long)]
    pub confirm: String,
}

#[derive(Args, Debug)]
pub struct ProjectAddDevArgs {
    /// Project ID.
    pub id: String,

    /// User to add.
    pub user: String,
}

#[derive(Debug, Serialize)]
struct ProjectDetail {
    #[serde(flatten)]
    project: Project,
    developers: Vec<User>,
    bug_count: usize,
    open_bug_count: usize,
}

#[derive(Debug, Serialize)]
struct DeleteOutput {
    ok: bool,
    id: String,
    name: String,
}

pub fn run_project(args: &ProjectArgs, ctx: &Context<'_>) -> anyhow::Result<()> {
    match &args.command {
        ProjectCommand::Create(a) => run_create(a, ctx),
        ProjectCommand::List(a) => run_list(a, ctx),
        ProjectCommand::Show(a) => run_show(a, ctx),
        ProjectCommand::Delete(a) => run_delete(a, ctx),
        ProjectCommand::AddDev(a) => run_add_dev(a, ctx),
        ProjectCommand::Developers(a) => run_developers(a, ctx),
    }
}

fn run_create(args: &ProjectCreateArgs, ctx: &Context<'_>) -> anyhow::Result<()> {
    let actor = ctx.actor()?;
    for dev in &args.developers {
        validate::validate_user_id(dev).map_err(|e| ctx.reject(&e))?;
    }

    let mut tracker = ctx.open()?;
    let name = lifecycle::validate_project_name(&args.name, tracker.rules())
        .map_err(|e| ctx.fail(e))?;
    let project = tracker
        .store_mut()
        .create_project(&name, &actor, &args.developers)
        .map_err(|e| ctx.fail(e))?;
    tracing::info!(project = %project.id, owner = %actor, "project created");

    render_mode(
        ctx.output,
        &project,
        |p, w| writeln!(w, "{}\t{}", p.id, p.name),
        |p, w| writeln!(w, "✓ Created {} ({})", p.id, p.name),
    )
}

fn run_list(args: &ProjectListArgs, ctx: &Context<'_>) -> anyhow::Result<()> {
    let actor = ctx.actor()?;
    let tracker = ctx.open()?;
    let projects = tracker
        .store()
        .list_projects(&actor, args.scope.into())
        .map_err(|e| ctx.fail(e))?;
    let projects = sort_projects_by_recency(&projects);

    render_mode(
        ctx.output,
        &projects,
        |projects, w| {
            for p in projects {
                let role = if p.is_owner(&actor) { "owner" } else { "developer" };
                writeln!(w, "{}\t{}\t{role}", p.id, p.name)?;
            }
            Ok(())
        },
        |projects, w| {
            if projects.is_empty() {
                return writeln!(w, "No projects.");
            }
            pretty_section(w, "Projects")?;
            for p in projects {
                let role = if p.is_owner(&actor) { "owner" } else { "developer" };
                writeln!(w, "{:<14} {:<32} {role}", p.id, p.name)?;
            }
            Ok(())
        },
    )
}

fn run_show(args: &ProjectIdArgs, ctx: &Context<'_>) -> anyhow::Result<()> {
    validate::validate_project_id(&args.id).map_err(|e| ctx.reject(&e))?;
    let tracker = ctx.open()?;
    let store = tracker.store();
    let detail = store
        .fetch_project(&args.id)
        .and_then(|project| {
            let developers = store.fetch_project_developers(&project.id)?;
            let bugs = store.list_project_bugs(&project.id)?;
            Ok(ProjectDetail {
                open_bug_count: bugs.iter().filter(|b| b.status.is_open()).count(),
                bug_count: bugs.len(),
                project,
                developers,
            })
        })
        .map_err(|e| ctx.fail(e))?;

    render_mode(
        ctx.output,
        &detail,
        |d, w| {
            writeln!(
                w,
                "{}\t{}\t{}\t{}\t{}",
                d.project.id, d.project.name, d.project.owner_id, d.bug_count, d.open_bug_count
            )
        },
        |d, w| {
            pretty_section(w, &d.project.name)?;
            pretty_kv(w, "id", &d.project.id)?;
            pretty_kv(w, "owner", &d.project.owner_id)?;
            pretty_kv(w, "bugs", format!("{} ({} open)", d.bug_count, d.open_bug_count))?;
            pretty_kv(w, "updated", d.project.updated_at.to_rfc3339())?;
            pretty_rule(w)?;
            for dev in &d.developers {
                writeln!(w, "  {:<16} {}", dev.id, dev.name)?;
            }
            Ok(())
        },
    )
}

fn run_delete(args: &ProjectDeleteArgs, ctx: &Context<'_>) -> anyhow::Result<()> {
    validate::validate_project_id(&args.id).map_err(|e| ctx.reject(&e))?;
    let actor = ctx.actor()?;
    let mut tracker = ctx.open()?;
    let project = tracker
        .delete_project(&args.id, &actor, &args.confirm)
        .map_err(|e| ctx.fail(e))?;

    let result = DeleteOutput {
        ok: true,
        id: project.id,
        name: project.name,
    };
    render(ctx.output, &result, |r, w| {
        writeln!(w, "✓ Deleted {} ({})", r.id, r.name)
    })
}

fn run_add_dev(args: &ProjectAddDevArgs, ctx: &Context<'_>) -> anyhow::Result<()> {
    validate::validate_project_id(&args.id).map_err(|e| ctx.reject(&e))?;
    validate::validate_user_id(&args.user).map_err(|e| ctx.reject(&e))?;
    let actor = ctx.actor()?;
    let mut tracker = ctx.open()?;

    let project = tracker
        .store()
        .fetch_project(&args.id)
        .and_then(|project| {
            if project.is_owner(&actor) {
                Ok(project)
            } else {
                Err(TrackerError::Unauthorized {
                    actor: actor.clone(),
                    action: "add developers to this project",
                })
            }
        })
        .and_then(|_| tracker.store_mut().add_developer(&args.id, &args.user))
        .map_err(|e| ctx.fail(e))?;

    render_mode(
        ctx.output,
        &project,
        |p, w| writeln!(w, "{}\t{}", p.id, p.developer_ids.join(",")),
        |p, w| writeln!(w, "✓ {} now develops on {}", args.user, p.name),
    )
}

fn run_developers(args: &ProjectIdArgs, ctx: &Context<'_>) -> anyhow::Result<()> {
    validate::validate_project_id(&args.id).map_err(|e| ctx.reject(&e))?;
    let tracker = ctx.open()?;
    let developers = tracker
        .store()
        .fetch_project_developers(&args.id)
        .map_err(|e| ctx.fail(e))?;

    render(ctx.output, &developers, |devs, w| {
        for dev in devs {
            writeln!(w, "{}\t{}", dev.id, dev.name)?;
        }
        Ok(())
    })
}
