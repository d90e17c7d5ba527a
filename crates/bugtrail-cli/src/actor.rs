//! Acting-user resolution for CLI commands.
//!
//! The resolution chain: `--as` flag > `BUGTRAIL_USER` env > `user` in the
//! user config > `USER` env (TTY only). Mutating commands require an acting
//! user; read-only commands work without one.

use std::env;

/// Errors from actor resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorResolutionError {
    /// Human-readable description.
    pub message: String,
    /// Machine error code.
    pub code: &'static str,
}

impl std::fmt::Display for ActorResolutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ActorResolutionError {}

/// Environment reader trait for dependency injection in tests.
trait EnvReader {
    fn get(&self, key: &str) -> Option<String>;
    fn is_tty(&self) -> bool;
}

struct RealEnv;

impl EnvReader for RealEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.is_empty())
    }

    fn is_tty(&self) -> bool {
        use std::io::IsTerminal;
        std::io::stdin().is_terminal()
    }
}

fn resolve_actor_with(
    cli_flag: Option<&str>,
    config_user: Option<&str>,
    env: &dyn EnvReader,
) -> Option<String> {
    if let Some(user) = cli_flag.filter(|u| !u.is_empty()) {
        return Some(user.to_string());
    }

    if let Some(val) = env.get("BUGTRAIL_USER") {
        return Some(val);
    }

    if let Some(user) = config_user.filter(|u| !u.is_empty()) {
        return Some(user.to_string());
    }

    // USER is only trusted interactively.
    if env.is_tty() {
        return env.get("USER");
    }

    None
}

/// Resolve the acting user, returning an error if none is configured.
pub fn require_actor(
    cli_flag: Option<&str>,
    config_user: Option<&str>,
) -> Result<String, ActorResolutionError> {
    resolve_actor_with(cli_flag, config_user, &RealEnv).ok_or_else(|| ActorResolutionError {
        message: "Acting user required for this command.".to_string(),
        code: "missing_user",
    })
}
