//! Domain records: users, projects, bugs and comments.

pub mod bug;
pub mod id;
pub mod project;

pub use bug::{Bug, BugSummary, Comment, ParseEnumError, Priority, Status};
pub use project::{AssignedScope, Project, ProjectScope, Sidebar, User};
