use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Severity of a bug. Declaration order is the severity ranking, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    /// Every priority in severity order (`Critical` first).
    pub const ALL: [Self; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];

    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }

    /// Position in the fixed severity ranking `[CRITICAL, HIGH, MEDIUM, LOW]`.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }

    /// Display label ("Critical", "High", ...).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

/// Lifecycle stage of a bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Unassigned,
    Todo,
    InProgress,
    Testing,
    Closed,
}

impl Status {
    pub const ALL: [Self; 5] = [
        Self::Unassigned,
        Self::Todo,
        Self::InProgress,
        Self::Testing,
        Self::Closed,
    ];

    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Unassigned => "UNASSIGNED",
            Self::Todo => "TODO",
            Self::InProgress => "INPROGRESS",
            Self::Testing => "TESTING",
            Self::Closed => "CLOSED",
        }
    }

    /// Display label ("In Progress", ...).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unassigned => "Unassigned",
            Self::Todo => "Todo",
            Self::InProgress => "In Progress",
            Self::Testing => "Testing",
            Self::Closed => "Closed",
        }
    }

    #[must_use]
    pub const fn is_open(self) -> bool {
        !matches!(self, Self::Closed)
    }
}

/// A comment on a bug. Comments are append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub bug_id: String,
    pub author_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Canonical bug record including its comment thread (oldest first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bug {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: Status,
    pub reporter_id: String,
    pub assignee_id: Option<String>,
    pub project_id: String,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bug {
    #[must_use]
    pub fn is_assigned_to(&self, user_id: &str) -> bool {
        self.assignee_id.as_deref() == Some(user_id)
    }

    /// List-row projection of this record.
    #[must_use]
    pub fn summary(&self) -> BugSummary {
        BugSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            priority: self.priority,
            status: self.status,
            reporter_id: self.reporter_id.clone(),
            assignee_id: self.assignee_id.clone(),
            project_id: self.project_id.clone(),
            comment_count: self.comments.len(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// A bug as returned by list queries: comment bodies replaced by a count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: Status,
    pub reporter_id: String,
    pub assignee_id: Option<String>,
    pub project_id: String,
    pub comment_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uppercase and drop separators so `in-progress`, `in_progress` and
/// `InProgress` all match `INPROGRESS`.
fn normalize(input: &str) -> String {
    input
        .trim()
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .collect::<String>()
        .to_ascii_uppercase()
}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "CRITICAL" => Ok(Self::Critical),
            "HIGH" => Ok(Self::High),
            "MEDIUM" => Ok(Self::Medium),
            "LOW" => Ok(Self::Low),
            _ => Err(ParseEnumError {
                expected: "priority",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for Status {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "UNASSIGNED" => Ok(Self::Unassigned),
            "TODO" => Ok(Self::Todo),
            "INPROGRESS" => Ok(Self::InProgress),
            "TESTING" => Ok(Self::Testing),
            "CLOSED" => Ok(Self::Closed),
            _ => Err(ParseEnumError {
                expected: "status",
                got: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Priority, Status};
    use std::str::FromStr;

    #[test]
    fn enums_serialize_like_the_database() {
        assert_eq!(
            serde_json::to_string(&Status::InProgress).unwrap(),
            "\"INPROGRESS\""
        );
        assert_eq!(
            serde_json::to_string(&Priority::Critical).unwrap(),
            "\"CRITICAL\""
        );
        assert_eq!(
            serde_json::from_str::<Status>("\"UNASSIGNED\"").unwrap(),
            Status::Unassigned
        );
    }

    #[test]
    fn parse_is_lenient_about_case_and_separators() {
        assert_eq!(Status::from_str("in-progress").unwrap(), Status::InProgress);
        assert_eq!(Status::from_str("In Progress").unwrap(), Status::InProgress);
        assert_eq!(Status::from_str(" todo ").unwrap(), Status::Todo);
        assert_eq!(Priority::from_str("critical").unwrap(), Priority::Critical);
    }

    #[test]
    fn parse_rejects_unknown_values() {
        let err = Status::from_str("doing").unwrap_err();
        assert_eq!(err.expected, "status");
        assert_eq!(err.to_string(), "invalid status: 'doing'");
        assert!(Priority::from_str("urgent").is_err());
    }

    #[test]
    fn display_parse_roundtrips() {
        for value in Status::ALL {
            assert_eq!(Status::from_str(&value.to_string()).unwrap(), value);
        }
        for value in Priority::ALL {
            assert_eq!(Priority::from_str(&value.to_string()).unwrap(), value);
        }
    }

    #[test]
    fn priority_rank_follows_severity() {
        let ranks: Vec<u8> = Priority::ALL.iter().map(|p| p.rank()).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3]);
        assert!(Priority::Critical < Priority::Low);
    }

    #[test]
    fn only_closed_is_not_open() {
        assert!(!Status::Closed.is_open());
        assert!(Status::ALL.iter().filter(|s| s.is_open()).count() == 4);
    }
}
