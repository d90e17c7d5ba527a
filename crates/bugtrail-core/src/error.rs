use std::fmt;

/// Machine-readable error codes surfaced by the CLI and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    Unauthorized,
    InvalidAssignee,
    ValidationFailed,
    UserNotFound,
    ProjectNotFound,
    BugNotFound,
    PersistenceFailed,
    PersistenceTimeout,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::Unauthorized => "E2001",
            Self::InvalidAssignee => "E2002",
            Self::ValidationFailed => "E2003",
            Self::UserNotFound => "E3001",
            Self::ProjectNotFound => "E3002",
            Self::BugNotFound => "E3003",
            Self::PersistenceFailed => "E5001",
            Self::PersistenceTimeout => "E5002",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Tracker not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::Unauthorized => "Not allowed for this user",
            Self::InvalidAssignee => "Assignee is not a project member",
            Self::ValidationFailed => "Invalid input",
            Self::UserNotFound => "User not found",
            Self::ProjectNotFound => "Project not found",
            Self::BugNotFound => "Bug not found",
            Self::PersistenceFailed => "Database write failed",
            Self::PersistenceTimeout => "Database write timed out",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `bt init` to create the tracker database."),
            Self::ConfigParseError => Some("Fix syntax in .bugtrail/config.toml and retry."),
            Self::Unauthorized => {
                Some("Only the project owner may close bugs; owner or reporter sets priority.")
            }
            Self::InvalidAssignee => Some("Add the user to the project with `bt project add-dev`."),
            Self::ValidationFailed => None,
            Self::UserNotFound => Some("List known users with `bt user list`."),
            Self::ProjectNotFound => Some("List your projects with `bt project list`."),
            Self::BugNotFound => Some("List bugs with `bt bug list <project>`."),
            Self::PersistenceFailed | Self::PersistenceTimeout => {
                Some("Retry the command. Nothing was changed.")
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Entity kinds referenced by [`TrackerError::NotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    User,
    Project,
    Bug,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::User => "user",
            Self::Project => "project",
            Self::Bug => "bug",
        })
    }
}

/// Failure of a tracker operation.
///
/// Lifecycle operations fail closed: whenever one of these is returned the
/// caller's cached record has not been changed. Only [`Persistence`] is worth
/// retrying with the same input.
///
/// [`Persistence`]: TrackerError::Persistence
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackerError {
    #[error("{actor} may not {action}")]
    Unauthorized { actor: String, action: &'static str },

    #[error("user '{user}' is not a member of project '{project}'")]
    InvalidAssignee { user: String, project: String },

    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("{entity} '{id}' not found")]
    NotFound { entity: Entity, id: String },

    #[error("persistence failure: {message}")]
    Persistence { message: String, timed_out: bool },
}

impl TrackerError {
    pub(crate) fn unauthorized(actor: &str, action: &'static str) -> Self {
        Self::Unauthorized {
            actor: actor.to_string(),
            action,
        }
    }

    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(entity: Entity, id: &str) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Whether retrying the same request may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence { .. })
    }

    /// Machine-readable code for this failure.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Unauthorized { .. } => ErrorCode::Unauthorized,
            Self::InvalidAssignee { .. } => ErrorCode::InvalidAssignee,
            Self::Validation { .. } => ErrorCode::ValidationFailed,
            Self::NotFound { entity, .. } => match entity {
                Entity::User => ErrorCode::UserNotFound,
                Entity::Project => ErrorCode::ProjectNotFound,
                Entity::Bug => ErrorCode::BugNotFound,
            },
            Self::Persistence { timed_out: true, .. } => ErrorCode::PersistenceTimeout,
            Self::Persistence { .. } => ErrorCode::PersistenceFailed,
        }
    }

    /// Remediation text for operators, falling back to the code message.
    #[must_use]
    pub fn suggestion(&self) -> String {
        let code = self.code();
        code.hint().unwrap_or(code.message()).to_string()
    }
}

pub type Result<T, E = TrackerError> = std::result::Result<T, E>;
