//! Time reconciliation
//!
//! This module merges task estimates with the time-log sheet:
//! - Logs are matched to a task by exact trimmed id or key
//! - Matching logs are split into the task's sprint window vs. everything else
//! - Remaining estimate and spent figures are derived from the split
//!
//! The self-reported spent figure on the task row is never consulted.

use crate::types::{SprintPeriod, Task, TimeLogEntry};
use log::{debug, warn};
use std::collections::HashMap;

/// Time logs grouped by their trimmed task reference
pub struct TimeLogIndex<'a> {
    by_ref: HashMap<&'a str, Vec<&'a TimeLogEntry>>,
}

impl<'a> TimeLogIndex<'a> {
    pub fn new(logs: &'a [TimeLogEntry]) -> Self {
        let mut by_ref: HashMap<&'a str, Vec<&'a TimeLogEntry>> = HashMap::new();
        for entry in logs {
            let task_ref = entry.task_ref.trim();
            if task_ref.is_empty() {
                continue;
            }
            by_ref.entry(task_ref).or_default().push(entry);
        }
        Self { by_ref }
    }

    /// Entries whose reference equals the task's id or key
    pub fn entries_for(&self, task: &Task) -> Vec<&'a TimeLogEntry> {
        let id = task.id.trim();
        let key = task.key.trim();

        let mut entries = Vec::new();
        if !id.is_empty() {
            if let Some(found) = self.by_ref.get(id) {
                entries.extend(found.iter().copied());
            }
        }
        if !key.is_empty() && key != id {
            if let Some(found) = self.by_ref.get(key) {
                entries.extend(found.iter().copied());
            }
        }
        entries
    }

    /// References that point at none of the given tasks
    pub fn unmatched_refs(&self, tasks: &[Task]) -> Vec<&'a str> {
        let mut refs: Vec<&'a str> = self
            .by_ref
            .keys()
            .copied()
            .filter(|r| !tasks.iter().any(|t| t.matches_ref(r)))
            .collect();
        refs.sort_unstable();
        refs
    }

    pub fn is_empty(&self) -> bool {
        self.by_ref.is_empty()
    }
}

/// Reconcile one task against the full log sheet.
///
/// With a period, in-window entries count as current-sprint spend and the
/// rest as other-sprint spend. Without one, every matching entry is
/// current-sprint spend. The input task is left untouched.
pub fn reconcile(task: &Task, logs: &[TimeLogEntry], period: Option<&SprintPeriod>) -> Task {
    let entries = logs.iter().filter(|entry| task.matches_ref(&entry.task_ref));
    apply_entries(task, entries, period.as_slice())
}

/// Reconcile one task against a union of windows.
///
/// An entry inside any of the windows is current spend. An empty window
/// list counts every entry as current.
pub fn reconcile_within(task: &Task, index: &TimeLogIndex<'_>, windows: &[&SprintPeriod]) -> Task {
    apply_entries(task, index.entries_for(task).into_iter(), windows)
}

/// Date window per trimmed sprint name. The first window wins for
/// duplicated names.
pub fn sprint_windows(sprints: &[SprintPeriod]) -> HashMap<&str, &SprintPeriod> {
    let mut windows: HashMap<&str, &SprintPeriod> = HashMap::new();
    for sprint in sprints {
        windows.entry(sprint.name.trim()).or_insert(sprint);
    }
    windows
}

/// Reconcile every task against its own sprint's window
pub fn reconcile_all(
    tasks: &[Task],
    logs: &[TimeLogEntry],
    sprints: &[SprintPeriod],
) -> Vec<Task> {
    let index = TimeLogIndex::new(logs);
    let windows = sprint_windows(sprints);

    debug!(
        "reconciling {} tasks against {} time logs and {} sprints",
        tasks.len(),
        logs.len(),
        sprints.len()
    );

    tasks
        .iter()
        .map(|task| {
            let period = windows.get(task.sprint.trim()).copied();
            if period.is_none() && !task.is_backlog() {
                warn!(
                    "task {} references sprint '{}' with no date window; \
                     all hours count as current",
                    task.key, task.sprint
                );
            }
            reconcile_within(task, &index, period.as_slice())
        })
        .collect()
}

fn apply_entries<'a>(
    task: &Task,
    entries: impl Iterator<Item = &'a TimeLogEntry>,
    windows: &[&SprintPeriod],
) -> Task {
    let mut in_sprint = 0.0;
    let mut other_sprints = 0.0;

    for entry in entries {
        if windows.is_empty() || windows.iter().any(|w| w.contains(&entry.logged_at)) {
            in_sprint += entry.hours;
        } else {
            other_sprints += entry.hours;
        }
    }

    let mut reconciled = task.clone();
    reconciled.spent_in_sprint_hours = in_sprint;
    reconciled.spent_in_other_sprints_hours = other_sprints;
    reconciled.total_spent_hours = in_sprint + other_sprints;
    reconciled.remaining_estimate_hours =
        (task.original_estimate_hours - other_sprints).max(0.0);
    reconciled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskType;
    use chrono::{NaiveDate, NaiveDateTime};
    use pretty_assertions::assert_eq;

    fn at(date: &str) -> NaiveDateTime {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn sprint() -> SprintPeriod {
        SprintPeriod::new(
            "Sprint 7",
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        )
    }

    fn task() -> Task {
        Task::new("1001", "dev-1", TaskType::Feature, 3, 10.0)
            .with_key("PRJ-7")
            .with_sprint("Sprint 7")
    }

    #[test]
    fn test_split_by_sprint_window() {
        let logs = vec![
            TimeLogEntry::new("PRJ-7", at("2024-02-28"), 3.0),
            TimeLogEntry::new("1001", at("2024-03-04"), 2.0),
            TimeLogEntry::new("PRJ-7", at("2024-03-15"), 1.5),
            TimeLogEntry::new("PRJ-8", at("2024-03-05"), 4.0),
        ];

        let reconciled = reconcile(&task(), &logs, Some(&sprint()));

        assert_eq!(reconciled.spent_in_sprint_hours, 3.5);
        assert_eq!(reconciled.spent_in_other_sprints_hours, 3.0);
        assert_eq!(reconciled.total_spent_hours, 6.5);
        assert_eq!(reconciled.remaining_estimate_hours, 7.0);
    }

    #[test]
    fn test_no_period_counts_everything_as_current() {
        let logs = vec![
            TimeLogEntry::new("PRJ-7", at("2023-12-01"), 3.0),
            TimeLogEntry::new("PRJ-7", at("2024-03-05"), 2.0),
        ];

        let reconciled = reconcile(&task(), &logs, None);

        assert_eq!(reconciled.spent_in_sprint_hours, 5.0);
        assert_eq!(reconciled.spent_in_other_sprints_hours, 0.0);
        assert_eq!(reconciled.remaining_estimate_hours, 10.0);
    }

    #[test]
    fn test_reported_spent_is_never_a_fallback() {
        let mut legacy = task();
        legacy.reported_spent_hours = Some(42.0);

        let reconciled = reconcile(&legacy, &[], Some(&sprint()));

        assert_eq!(reconciled.total_spent_hours, 0.0);
        assert_eq!(reconciled.spent_in_sprint_hours, 0.0);
        assert_eq!(reconciled.spent_in_other_sprints_hours, 0.0);
        assert_eq!(reconciled.remaining_estimate_hours, 10.0);
        assert_eq!(reconciled.reported_spent_hours, Some(42.0));
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let logs = vec![TimeLogEntry::new("prj-7", at("2024-03-05"), 2.0)];
        let reconciled = reconcile(&task(), &logs, Some(&sprint()));
        assert_eq!(reconciled.total_spent_hours, 0.0);
    }

    #[test]
    fn test_remaining_estimate_never_negative() {
        let logs = vec![TimeLogEntry::new("PRJ-7", at("2024-01-10"), 25.0)];
        let reconciled = reconcile(&task(), &logs, Some(&sprint()));

        assert_eq!(reconciled.remaining_estimate_hours, 0.0);
        assert!(reconciled.remaining_estimate_hours <= reconciled.original_estimate_hours);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let logs = vec![
            TimeLogEntry::new("PRJ-7", at("2024-02-28"), 3.0),
            TimeLogEntry::new("PRJ-7", at("2024-03-06"), 2.0),
        ];

        let once = reconcile(&task(), &logs, Some(&sprint()));
        let twice = reconcile(&once, &logs, Some(&sprint()));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_reconcile_all_uses_each_tasks_sprint() {
        let s7 = sprint();
        let s8 = SprintPeriod::new(
            "Sprint 8",
            NaiveDate::from_ymd_opt(2024, 3, 18).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 29).unwrap(),
        );
        let tasks = vec![
            task(),
            Task::new("1002", "dev-1", TaskType::Bug, 2, 4.0).with_sprint("Sprint 8"),
        ];
        let logs = vec![
            TimeLogEntry::new("PRJ-7", at("2024-03-05"), 2.0),
            TimeLogEntry::new("1002", at("2024-03-05"), 1.0),
            TimeLogEntry::new("1002", at("2024-03-20"), 3.0),
        ];

        let reconciled = reconcile_all(&tasks, &logs, &[s7, s8]);

        assert_eq!(reconciled[0].spent_in_sprint_hours, 2.0);
        assert_eq!(reconciled[1].spent_in_sprint_hours, 3.0);
        assert_eq!(reconciled[1].spent_in_other_sprints_hours, 1.0);
        assert_eq!(reconciled[1].remaining_estimate_hours, 3.0);
    }

    #[test]
    fn test_index_matches_reconcile() {
        let logs = vec![
            TimeLogEntry::new(" 1001 ", at("2024-03-05"), 2.0),
            TimeLogEntry::new("PRJ-7", at("2024-03-06"), 1.0),
            TimeLogEntry::new("ORPHAN-1", at("2024-03-06"), 1.0),
        ];
        let index = TimeLogIndex::new(&logs);
        let tasks = vec![task()];

        assert_eq!(index.entries_for(&tasks[0]).len(), 2);
        assert_eq!(index.unmatched_refs(&tasks), vec!["ORPHAN-1"]);

        let via_index = reconcile_all(&tasks, &logs, &[sprint()]);
        let direct = reconcile(&tasks[0], &logs, Some(&sprint()));
        assert_eq!(via_index[0], direct);
    }

    #[test]
    fn test_id_equal_to_key_not_double_counted() {
        let t = Task::new("PRJ-9", "dev-1", TaskType::Story, 2, 6.0);
        let logs = vec![TimeLogEntry::new("PRJ-9", at("2024-03-05"), 2.0)];

        let reconciled = reconcile_all(&[t], &logs, &[]);
        assert_eq!(reconciled[0].total_spent_hours, 2.0);
    }

    #[test]
    fn test_union_of_windows_counts_as_current() {
        let s8 = SprintPeriod::new(
            "Sprint 8",
            NaiveDate::from_ymd_opt(2024, 3, 18).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 29).unwrap(),
        );
        let logs = vec![
            TimeLogEntry::new("PRJ-7", at("2024-03-05"), 2.0),
            TimeLogEntry::new("PRJ-7", at("2024-03-20"), 3.0),
            TimeLogEntry::new("PRJ-7", at("2024-04-10"), 4.0),
        ];
        let index = TimeLogIndex::new(&logs);
        let s7 = sprint();

        let reconciled = reconcile_within(&task(), &index, &[&s7, &s8]);

        assert_eq!(reconciled.spent_in_sprint_hours, 5.0);
        assert_eq!(reconciled.spent_in_other_sprints_hours, 4.0);
        assert_eq!(reconciled.total_spent_hours, 9.0);
        assert_eq!(reconciled.remaining_estimate_hours, 6.0);
    }

    #[test]
    fn test_first_window_wins_for_duplicate_names() {
        let late = SprintPeriod::new(
            "Sprint 7",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 12).unwrap(),
        );
        let sprints = vec![sprint(), late];

        let windows = sprint_windows(&sprints);

        assert_eq!(windows.len(), 1);
        assert_eq!(windows["Sprint 7"].start, sprints[0].start);
    }
}
