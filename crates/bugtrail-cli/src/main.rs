#![forbid(unsafe_code)]

mod actor;
mod cmd;
mod output;
mod validate;

use bugtrail_core::{ErrorCode, config};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use output::{CliError, OutputMode};
use std::env;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "bugtrail: multi-project bug tracker",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Act as this user (skips env/config resolution).
    #[arg(long = "as", value_name = "USER", global = true)]
    as_user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize a tracker in the current directory",
        after_help = "EXAMPLES:\n    bt init\n\n    # Emit machine-readable output\n    bt init --json"
    )]
    Init(cmd::init::InitArgs),

    #[command(next_help_heading = "Setup", about = "Manage users")]
    User(cmd::user::UserArgs),

    #[command(next_help_heading = "Projects", about = "Manage projects")]
    Project(cmd::project::ProjectArgs),

    #[command(next_help_heading = "Bugs", about = "File, show and list bugs")]
    Bug(cmd::bug::BugArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Change a bug's status",
        after_help = "EXAMPLES:\n    bt status bug-1a2b3c4d in-progress\n\n    # Only the project owner may close\n    bt --as alice status bug-1a2b3c4d closed"
    )]
    Status(cmd::status::StatusArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Change a bug's priority",
        after_help = "EXAMPLES:\n    bt priority bug-1a2b3c4d critical"
    )]
    Priority(cmd::priority::PriorityArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Assign a bug to a project member",
        after_help = "EXAMPLES:\n    bt assign bug-1a2b3c4d bob"
    )]
    Assign(cmd::assign::AssignArgs),

    #[command(next_help_heading = "Lifecycle", about = "Clear a bug's assignee")]
    Unassign(cmd::assign::UnassignArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Comment on a bug",
        after_help = "EXAMPLES:\n    bt comment bug-1a2b3c4d \"Reproduced on staging\""
    )]
    Comment(cmd::comment::CommentArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show your projects and open assigned bugs"
    )]
    Sidebar,

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completion scripts",
        after_help = "EXAMPLES:\n    bt completions bash\n    bt completions zsh"
    )]
    Completions {
        /// Target shell for completion script generation.
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("BUGTRAIL_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "bugtrail=debug,info"
        } else {
            "bugtrail=info,warn"
        })
    });

    let format = env::var("BUGTRAIL_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    // Logs go to stderr so stdout stays parseable.
    let registry = tracing_subscriber::registry().with(filter);
    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// A malformed config file is reported before the output mode is known, so
/// only `--json` selects JSON here.
fn config_error(err: &anyhow::Error) -> CliError {
    let code = ErrorCode::ConfigParseError;
    CliError::with_details(
        format!("{err:#}"),
        code.hint().unwrap_or(code.message()),
        code.code(),
    )
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cwd = env::current_dir()?;
    let project_root = cmd::find_tracker_root(&cwd).unwrap_or(cwd);
    let config = match config::resolve_config(&project_root, cli.json) {
        Ok(config) => config,
        Err(err) => {
            let mode = if cli.json { OutputMode::Json } else { OutputMode::Text };
            output::render_error(mode, &config_error(&err))?;
            return Err(err);
        }
    };
    let output = OutputMode::from_resolved(&config.resolved_output);
    debug!(root = %project_root.display(), ?output, "resolved configuration");

    let ctx = cmd::Context {
        root: &project_root,
        output,
        config: &config,
        as_user: cli.as_user.as_deref(),
    };

    match &cli.command {
        Commands::Init(args) => cmd::init::run_init(args, output, &project_root),
        Commands::User(args) => cmd::user::run_user(args, &ctx),
        Commands::Project(args) => cmd::project::run_project(args, &ctx),
        Commands::Bug(args) => cmd::bug::run_bug(args, &ctx),
        Commands::Status(args) => cmd::status::run_status(args, &ctx),
        Commands::Priority(args) => cmd::priority::run_priority(args, &ctx),
        Commands::Assign(args) => cmd::assign::run_assign(args, &ctx),
        Commands::Unassign(args) => cmd::assign::run_unassign(args, &ctx),
        Commands::Comment(args) => cmd::comment::run_comment(args, &ctx),
        Commands::Sidebar => cmd::sidebar::run_sidebar(&ctx),
        Commands::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "bt", &mut std::io::stdout());
            Ok(())
        }
    }
}
