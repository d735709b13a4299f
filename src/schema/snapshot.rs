//! Snapshot parsing and validation

use crate::config::{MAX_COMPLEXITY, MIN_COMPLEXITY};
use crate::error::ComputeError;
use crate::reconciler::TimeLogIndex;
use crate::types::{SprintPeriod, Task, TimeLogEntry};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

/// Timestamp layouts accepted for time-log entries
const LOG_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];

/// Task list, time-log sheet and sprint calendar supplied by the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub time_logs: Vec<TimeLogEntry>,
    #[serde(default)]
    pub sprints: Vec<SprintPeriod>,
}

impl Snapshot {
    pub fn sprint(&self, name: &str) -> Option<&SprintPeriod> {
        self.sprints.iter().find(|s| s.name == name.trim())
    }

    /// Named sprints ordered by start date, keeping the first window listed
    /// for a duplicated name
    pub fn dated_sprints(&self) -> Vec<&SprintPeriod> {
        let mut sprints: Vec<&SprintPeriod> = Vec::new();
        for sprint in &self.sprints {
            let name = sprint.name.trim();
            if !name.is_empty() && !sprints.iter().any(|s| s.name.trim() == name) {
                sprints.push(sprint);
            }
        }
        sprints.sort_by_key(|s| s.start);
        sprints
    }
}

/// Category of a validation finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    NegativeHours,
    ComplexityOutOfRange,
    TestNoteOutOfRange,
    InvertedSprintWindow,
    DuplicateSprint,
    UnmatchedTimeLog,
    MissingSprintWindow,
}

/// One best-effort validation finding. Findings never stop the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    /// Task id, sprint name or log reference the finding is about
    pub subject: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(kind: IssueKind, subject: impl Into<String>, message: String) -> Self {
        Self {
            kind,
            subject: subject.into(),
            message,
        }
    }
}

/// Adapter for snapshot input documents
pub struct SnapshotAdapter;

impl SnapshotAdapter {
    /// Parse a full snapshot document
    pub fn parse_json(json: &str) -> Result<Snapshot, ComputeError> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        Ok(snapshot)
    }

    /// Parse NDJSON (newline-delimited JSON) containing time-log entries
    pub fn parse_time_logs_ndjson(ndjson: &str) -> Result<Vec<TimeLogEntry>, ComputeError> {
        let mut entries = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<TimeLogEntry>(trimmed) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(entries)
    }

    /// Best-effort validation report over a snapshot
    pub fn validate(snapshot: &Snapshot) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        let mut seen_sprints = HashSet::new();
        for sprint in &snapshot.sprints {
            if sprint.end < sprint.start {
                issues.push(ValidationIssue::new(
                    IssueKind::InvertedSprintWindow,
                    &sprint.name,
                    format!("sprint ends {} before it starts {}", sprint.end, sprint.start),
                ));
            }
            if !seen_sprints.insert(sprint.name.trim()) {
                issues.push(ValidationIssue::new(
                    IssueKind::DuplicateSprint,
                    &sprint.name,
                    "sprint name appears more than once; the first window is used".to_string(),
                ));
            }
        }

        for task in &snapshot.tasks {
            if !(MIN_COMPLEXITY..=MAX_COMPLEXITY).contains(&task.complexity) {
                issues.push(ValidationIssue::new(
                    IssueKind::ComplexityOutOfRange,
                    &task.id,
                    format!("complexity {} is outside 1-5 and will be clamped", task.complexity),
                ));
            }
            if let Some(note) = task.test_note {
                if !(1.0..=5.0).contains(&note) {
                    issues.push(ValidationIssue::new(
                        IssueKind::TestNoteOutOfRange,
                        &task.id,
                        format!("test note {note} is outside 1-5"),
                    ));
                }
            }
            if task.original_estimate_hours < 0.0 {
                issues.push(ValidationIssue::new(
                    IssueKind::NegativeHours,
                    &task.id,
                    format!("negative original estimate {}", task.original_estimate_hours),
                ));
            }
            if !task.is_backlog() && !seen_sprints.contains(task.sprint.trim()) {
                issues.push(ValidationIssue::new(
                    IssueKind::MissingSprintWindow,
                    &task.id,
                    format!("sprint '{}' has no date window", task.sprint),
                ));
            }
        }

        for entry in snapshot.time_logs.iter().filter(|e| e.hours < 0.0) {
            issues.push(ValidationIssue::new(
                IssueKind::NegativeHours,
                &entry.task_ref,
                format!("negative time-log entry of {}h at {}", entry.hours, entry.logged_at),
            ));
        }

        let index = TimeLogIndex::new(&snapshot.time_logs);
        for task_ref in index.unmatched_refs(&snapshot.tasks) {
            issues.push(ValidationIssue::new(
                IssueKind::UnmatchedTimeLog,
                task_ref,
                "time-log reference matches no task id or key".to_string(),
            ));
        }

        issues
    }
}

/// Parse a time-log timestamp; a bare date means midnight
pub fn parse_log_timestamp(raw: &str) -> Result<NaiveDateTime, ComputeError> {
    let raw = raw.trim();
    for format in LOG_TIMESTAMP_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(parsed);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| ComputeError::DateParseError(format!("unrecognised timestamp '{raw}'")))
}

/// Serde hook for [`parse_log_timestamp`]
pub fn deserialize_log_timestamp<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_log_timestamp(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SNAPSHOT: &str = r#"{
        "tasks": [
            {
                "id": "10001",
                "key": "PAY-1",
                "assignee_id": "dev-1",
                "assignee_name": "Ana",
                "task_type": "bug",
                "complexity": 2,
                "status": "Done",
                "sprint": "Sprint 1",
                "original_estimate_hours": 6.0,
                "reported_spent_hours": 99.0
            },
            {
                "id": "10002",
                "key": "PAY-2",
                "assignee_id": "dev-2",
                "task_type": "Spike",
                "complexity": 7,
                "test_note": 6.5,
                "sprint": "Sprint 9",
                "original_estimate_hours": -1.0
            }
        ],
        "time_logs": [
            { "task_ref": "PAY-1", "logged_at": "2024-03-05 10:30:00", "hours": 4.0 },
            { "task_ref": "10001", "logged_at": "2024-03-06", "hours": 1.5 },
            { "task_ref": "GHOST-1", "logged_at": "2024-03-06T08:00:00", "hours": -2.0 }
        ],
        "sprints": [
            { "name": "Sprint 1", "start": "2024-03-04", "end": "2024-03-15" },
            { "name": "Sprint 2", "start": "2024-03-18", "end": "2024-03-17" },
            { "name": "Sprint 1", "start": "2024-04-01", "end": "2024-04-12" }
        ]
    }"#;

    fn kinds(issues: &[ValidationIssue]) -> Vec<(IssueKind, String)> {
        issues.iter().map(|i| (i.kind, i.subject.clone())).collect()
    }

    #[test]
    fn test_parse_snapshot() {
        let snapshot = SnapshotAdapter::parse_json(SNAPSHOT).unwrap();

        assert_eq!(snapshot.tasks.len(), 2);
        assert_eq!(snapshot.time_logs.len(), 3);
        assert_eq!(snapshot.tasks[0].reported_spent_hours, Some(99.0));
        assert_eq!(snapshot.tasks[0].total_spent_hours, 0.0);
        assert_eq!(
            snapshot.time_logs[1].logged_at,
            NaiveDate::from_ymd_opt(2024, 3, 6).unwrap().and_hms_opt(0, 0, 0).unwrap()
        );
        assert_eq!(snapshot.sprint("Sprint 1").unwrap().start.to_string(), "2024-03-04");
    }

    #[test]
    fn test_validation_report() {
        let snapshot = SnapshotAdapter::parse_json(SNAPSHOT).unwrap();
        let issues = SnapshotAdapter::validate(&snapshot);

        assert_eq!(
            kinds(&issues),
            vec![
                (IssueKind::InvertedSprintWindow, "Sprint 2".to_string()),
                (IssueKind::DuplicateSprint, "Sprint 1".to_string()),
                (IssueKind::ComplexityOutOfRange, "10002".to_string()),
                (IssueKind::TestNoteOutOfRange, "10002".to_string()),
                (IssueKind::NegativeHours, "10002".to_string()),
                (IssueKind::MissingSprintWindow, "10002".to_string()),
                (IssueKind::NegativeHours, "GHOST-1".to_string()),
                (IssueKind::UnmatchedTimeLog, "GHOST-1".to_string()),
            ]
        );
    }

    #[test]
    fn test_clean_snapshot_has_no_issues() {
        let snapshot = Snapshot::default();
        assert!(SnapshotAdapter::validate(&snapshot).is_empty());
    }

    #[test]
    fn test_parse_time_logs_ndjson() {
        let ndjson = r#"
{"task_ref": "PAY-1", "logged_at": "2024-03-05T10:30:00", "hours": 2.0}

{"task_ref": "PAY-2", "logged_at": "2024-03-05 11:00:00", "hours": 1.0}
"#;
        let entries = SnapshotAdapter::parse_time_logs_ndjson(ndjson).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].task_ref, "PAY-2");

        let broken = "{\"task_ref\": \"PAY-1\", \"logged_at\": \"yesterday\", \"hours\": 2.0}";
        let err = SnapshotAdapter::parse_time_logs_ndjson(broken).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_parse_log_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        assert_eq!(parse_log_timestamp("2024-03-05T10:30:00").unwrap(), expected);
        assert_eq!(parse_log_timestamp("2024-03-05 10:30:00").unwrap(), expected);
        assert_eq!(parse_log_timestamp(" 2024-03-05T10:30:00.000 ").unwrap(), expected);
        assert!(matches!(
            parse_log_timestamp("05/03/2024"),
            Err(ComputeError::DateParseError(_))
        ));
    }

    #[test]
    fn test_dated_sprints_keep_first_window() {
        let mut snapshot = SnapshotAdapter::parse_json(SNAPSHOT).unwrap();
        snapshot.sprints.insert(
            0,
            SprintPeriod::new(
                "Sprint 2",
                NaiveDate::from_ymd_opt(2024, 5, 6).unwrap(),
                NaiveDate::from_ymd_opt(2024, 5, 17).unwrap(),
            ),
        );

        let dated: Vec<(&str, String)> = snapshot
            .dated_sprints()
            .iter()
            .map(|s| (s.name.as_str(), s.start.to_string()))
            .collect();

        assert_eq!(
            dated,
            vec![
                ("Sprint 1", "2024-03-04".to_string()),
                ("Sprint 2", "2024-05-06".to_string()),
            ]
        );
    }
}
