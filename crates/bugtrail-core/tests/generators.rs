#![allow(dead_code)]

use bugtrail_core::model::{Bug, BugSummary, Priority, Project, Status};
use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;

pub const OWNER: &str = "owner";
pub const DEVELOPERS: [&str; 3] = ["dev-1", "dev-2", "reporter"];
pub const ACTORS: [&str; 5] = ["owner", "dev-1", "dev-2", "reporter", "stranger"];

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

pub fn fixed_project() -> Project {
    Project {
        id: "prj-prop".into(),
        name: "Property".into(),
        owner_id: OWNER.into(),
        developer_ids: DEVELOPERS.iter().map(|d| (*d).to_string()).collect(),
        created_at: at(0),
        updated_at: at(0),
    }
}

pub fn arb_priority() -> impl Strategy<Value = Priority> + Clone {
    prop::sample::select(Priority::ALL.to_vec())
}

pub fn arb_status() -> impl Strategy<Value = Status> + Clone {
    prop::sample::select(Status::ALL.to_vec())
}

pub fn arb_actor() -> impl Strategy<Value = String> + Clone {
    prop::sample::select(ACTORS.to_vec()).prop_map(str::to_string)
}

pub fn arb_member() -> impl Strategy<Value = String> + Clone {
    prop::sample::select(vec![OWNER, DEVELOPERS[0], DEVELOPERS[1], DEVELOPERS[2]])
        .prop_map(str::to_string)
}

/// A bug that already satisfies the assignee/status coupling.
pub fn arb_bug() -> impl Strategy<Value = Bug> + Clone {
    (
        arb_status(),
        arb_priority(),
        arb_member(),
        arb_member(),
        0i64..100_000,
    )
        .prop_map(|(status, priority, reporter, assignee, created)| Bug {
            id: "bug-prop".into(),
            title: "Generated".into(),
            description: String::new(),
            priority,
            status,
            reporter_id: reporter,
            assignee_id: (status != Status::Unassigned).then_some(assignee),
            project_id: "prj-prop".into(),
            comments: Vec::new(),
            created_at: at(created),
            updated_at: at(created),
        })
}

pub fn arb_rows() -> impl Strategy<Value = Vec<BugSummary>> + Clone {
    prop::collection::vec(
        (arb_status(), arb_priority(), 0i64..50, 0usize..6),
        0..40,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (status, priority, created, comments))| BugSummary {
                id: format!("bug-{i:04}"),
                title: format!("row {i}"),
                description: String::new(),
                priority,
                status,
                reporter_id: "reporter".into(),
                assignee_id: (status != Status::Unassigned).then(|| "dev-1".to_string()),
                project_id: "prj-prop".into(),
                comment_count: comments,
                created_at: at(created),
                updated_at: at(created),
            })
            .collect()
    })
}
