use std::collections::HashSet;

use bugtrail_core::model::{Priority, Status};
use bugtrail_core::ordering::{
    FilterSet, Rankable, SortCriterion, filter_by_status_and_priority, sort_bugs,
};
use proptest::prelude::*;

#[path = "generators.rs"]
mod generators;
use generators::*;

fn arb_criterion() -> impl Strategy<Value = SortCriterion> {
    prop::sample::select(SortCriterion::ALL.to_vec())
}

fn ids<T: Rankable>(rows: &[T]) -> Vec<String> {
    rows.iter().map(|r| r.id().to_string()).collect()
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(2000))]

    #[test]
    fn sorting_is_idempotent(rows in arb_rows(), criterion in arb_criterion()) {
        let once = sort_bugs(&rows, criterion);
        let twice = sort_bugs(&once, criterion);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn sorting_is_a_permutation(rows in arb_rows(), criterion in arb_criterion()) {
        let sorted = sort_bugs(&rows, criterion);
        let mut before = ids(&rows);
        let mut after = ids(&sorted);
        before.sort();
        after.sort();
        prop_assert_eq!(before, after);
    }

    #[test]
    fn equal_keys_keep_input_order(rows in arb_rows()) {
        // Rows are generated with ascending ids, so among equal comment
        // counts the ids must stay ascending.
        let sorted = sort_bugs(&rows, SortCriterion::MostComments);
        for pair in sorted.windows(2) {
            prop_assert!(pair[0].comment_count >= pair[1].comment_count);
            if pair[0].comment_count == pair[1].comment_count {
                prop_assert!(pair[0].id < pair[1].id);
            }
        }
    }

    #[test]
    fn highest_priority_is_non_decreasing_rank(rows in arb_rows()) {
        let sorted = sort_bugs(&rows, SortCriterion::HighestPriority);
        for pair in sorted.windows(2) {
            prop_assert!(pair[0].priority.rank() <= pair[1].priority.rank());
        }
    }

    #[test]
    fn full_filter_is_identity(rows in arb_rows()) {
        prop_assert_eq!(FilterSet::all().apply(&rows), rows);
    }

    #[test]
    fn empty_status_set_yields_nothing(
        rows in arb_rows(),
        priorities in prop::collection::hash_set(arb_priority(), 0..5),
    ) {
        let filtered = filter_by_status_and_priority(&rows, &HashSet::new(), &priorities);
        prop_assert!(filtered.is_empty());
    }

    #[test]
    fn filter_is_an_ordered_subsequence(
        rows in arb_rows(),
        statuses in prop::collection::hash_set(arb_status(), 0..6),
        priorities in prop::collection::hash_set(arb_priority(), 0..5),
    ) {
        let filtered = filter_by_status_and_priority(&rows, &statuses, &priorities);
        let mut cursor = rows.iter();
        for kept in &filtered {
            prop_assert!(statuses.contains(&kept.status));
            prop_assert!(priorities.contains(&kept.priority));
            prop_assert!(cursor.any(|r| r == kept));
        }
        let expected = rows
            .iter()
            .filter(|r| statuses.contains(&r.status) && priorities.contains(&r.priority))
            .count();
        prop_assert_eq!(filtered.len(), expected);
    }

    #[test]
    fn toggling_twice_restores_filters(status in arb_status(), priority in arb_priority()) {
        let mut filters = FilterSet::default();
        let original = filters.clone();
        filters.toggle_status(status);
        filters.toggle_status(status);
        filters.toggle_priority(priority);
        filters.toggle_priority(priority);
        prop_assert_eq!(filters, original);
    }
}

#[test]
fn three_bugs_by_comments_and_age() {
    let rows = three_rows();
    assert_eq!(ids(&sort_bugs(&rows, SortCriterion::MostComments)), ["b1", "b3", "b2"]);
    assert_eq!(ids(&sort_bugs(&rows, SortCriterion::Oldest)), ["b1", "b2", "b3"]);
}

fn three_rows() -> Vec<bugtrail_core::model::BugSummary> {
    [("b1", 1, 5), ("b2", 2, 1), ("b3", 3, 3)]
        .into_iter()
        .map(|(id, created, comments)| bugtrail_core::model::BugSummary {
            id: id.into(),
            title: id.into(),
            description: String::new(),
            priority: Priority::Medium,
            status: Status::Todo,
            reporter_id: "reporter".into(),
            assignee_id: Some("dev-1".into()),
            project_id: "prj-prop".into(),
            comment_count: comments,
            created_at: at(created),
            updated_at: at(created),
        })
        .collect()
}
