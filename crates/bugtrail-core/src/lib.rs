//! bugtrail-core library.
//!
//! # Conventions
//!
//! - **Errors**: domain operations return [`error::Result`] with a typed
//!   [`error::TrackerError`]; SQLite and config plumbing use `anyhow::Result`.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`, `trace!`).

pub mod capabilities;
pub mod config;
pub mod db;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod ordering;
pub mod store;
pub mod text;
pub mod tracker;
pub mod view;

pub use error::{ErrorCode, Result, TrackerError};
pub use store::{BugStore, SqliteStore};
pub use tracker::Tracker;
