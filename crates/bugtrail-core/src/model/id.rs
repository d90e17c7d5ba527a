//! Generated identifiers for projects, bugs and comments.
//!
//! Ids are `<prefix>-<8 hex>` where the hex is a blake3 digest over the
//! record payload, the wall clock, the process id and a process-wide counter.
//! Users keep operator-chosen ids.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

static COUNTER: AtomicU64 = AtomicU64::new(0);

const DIGEST_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Project,
    Bug,
    Comment,
}

impl IdKind {
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Project => "prj",
            Self::Bug => "bug",
            Self::Comment => "cmt",
        }
    }
}

/// Generate a fresh id for `kind` seeded by `payload`.
#[must_use]
pub fn generate(kind: IdKind, payload: &str) -> String {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let now = Utc::now().timestamp_micros();

    let mut hasher = blake3::Hasher::new();
    hasher.update(kind.prefix().as_bytes());
    hasher.update(payload.as_bytes());
    hasher.update(&now.to_le_bytes());
    hasher.update(&std::process::id().to_le_bytes());
    hasher.update(&n.to_le_bytes());
    let hex = hasher.finalize().to_hex();

    format!("{}-{}", kind.prefix(), &hex.as_str()[..DIGEST_LEN])
}
