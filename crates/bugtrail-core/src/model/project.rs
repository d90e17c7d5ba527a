use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A person who can own projects, develop on them and be assigned bugs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
}

/// A container of bugs with one owner and a developer roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    #[serde(default)]
    pub developer_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    /// Bumped whenever a child bug is created or changed.
    pub updated_at: DateTime<Utc>,
}

impl Project {
    #[must_use]
    pub fn is_owner(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }

    #[must_use]
    pub fn is_developer(&self, user_id: &str) -> bool {
        self.developer_ids.iter().any(|id| id == user_id)
    }

    /// Owner or developer: the users a bug may be assigned to.
    #[must_use]
    pub fn is_member(&self, user_id: &str) -> bool {
        self.is_owner(user_id) || self.is_developer(user_id)
    }
}

/// Which of a user's projects to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectScope {
    Owner,
    Developer,
    #[default]
    All,
}

/// Which of a user's assigned bugs to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssignedScope {
    /// Everything not closed.
    #[default]
    Open,
    All,
}

/// Navigation summary for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sidebar {
    pub user: User,
    pub owned: Vec<Project>,
    pub developing: Vec<Project>,
    pub open_assigned: Vec<super::BugSummary>,
}

#[cfg(test)]
mod tests {
    use super::Project;
    use chrono::Utc;

    fn project() -> Project {
        let now = Utc::now();
        Project {
            id: "prj-1".into(),
            name: "Website".into(),
            owner_id: "owner".into(),
            developer_ids: vec!["dev-1".into(), "dev-2".into()],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn membership_covers_owner_and_developers() {
        let p = project();
        assert!(p.is_member("owner"));
        assert!(p.is_member("dev-2"));
        assert!(!p.is_member("stranger"));
        assert!(p.is_owner("owner"));
        assert!(!p.is_developer("owner"));
    }
}
