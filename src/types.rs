//! Core types for the Sprint Pulse pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: tasks and time logs, reconciled tasks, task-level metrics,
//! sprint/period aggregates, temporal evolution and developer comparisons.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Test note assumed for tasks that were never rated
pub const DEFAULT_TEST_NOTE: f64 = 5.0;

/// Task classification, parsed leniently from the spreadsheet value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskType {
    Bug,
    Feature,
    Story,
    Task,
    Improvement,
    /// Hours spent helping teammates
    Assistance,
    Meeting,
    Training,
    /// Any other spreadsheet value, kept verbatim
    Other(String),
}

impl From<String> for TaskType {
    fn from(raw: String) -> Self {
        TaskType::parse(&raw)
    }
}

impl From<TaskType> for String {
    fn from(task_type: TaskType) -> Self {
        task_type.as_str().to_string()
    }
}

impl TaskType {
    pub fn as_str(&self) -> &str {
        match self {
            TaskType::Bug => "bug",
            TaskType::Feature => "feature",
            TaskType::Story => "story",
            TaskType::Task => "task",
            TaskType::Improvement => "improvement",
            TaskType::Assistance => "assistance",
            TaskType::Meeting => "meeting",
            TaskType::Training => "training",
            TaskType::Other(name) => name.as_str(),
        }
    }

    /// Lenient, case-insensitive parse of a spreadsheet cell
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "bug" | "defect" | "bugfix" => TaskType::Bug,
            "feature" | "new feature" => TaskType::Feature,
            "story" | "user story" => TaskType::Story,
            "task" | "sub-task" | "subtask" => TaskType::Task,
            "improvement" | "enhancement" => TaskType::Improvement,
            "assistance" | "support" | "help" => TaskType::Assistance,
            "meeting" => TaskType::Meeting,
            "training" => TaskType::Training,
            _ => TaskType::Other(raw.trim().to_string()),
        }
    }

    /// Defects are judged by absolute hours against the complexity zones
    pub fn is_defect(&self) -> bool {
        matches!(self, TaskType::Bug)
    }

    /// Neutral work does not say anything about delivery quality
    pub fn is_neutral(&self) -> bool {
        matches!(self, TaskType::Meeting | TaskType::Training)
    }

    pub fn is_assistance(&self) -> bool {
        matches!(self, TaskType::Assistance)
    }
}

/// A task row from the task sheet, optionally augmented by the reconciler.
///
/// `reported_spent_hours` is the legacy self-reported figure from the task
/// sheet. It is carried for display only and is never read by any metric.
/// All `*_spent_*` and `remaining_estimate_hours` fields are written
/// exclusively by [`crate::reconciler`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub key: String,
    pub assignee_id: String,
    #[serde(default)]
    pub assignee_name: String,
    pub task_type: TaskType,
    /// Complexity level (1-5)
    pub complexity: u8,
    /// Test quality note (1-5), if the task was rated
    #[serde(default)]
    pub test_note: Option<f64>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_at: Option<NaiveDate>,
    /// Sprint name, empty for backlog
    #[serde(default)]
    pub sprint: String,
    pub original_estimate_hours: f64,
    #[serde(default)]
    pub reported_spent_hours: Option<f64>,
    #[serde(default)]
    pub remaining_estimate_hours: f64,
    #[serde(default)]
    pub total_spent_hours: f64,
    #[serde(default)]
    pub spent_in_sprint_hours: f64,
    #[serde(default)]
    pub spent_in_other_sprints_hours: f64,
}

impl Task {
    /// Create a task with the identity, classification and estimate set.
    /// The key defaults to the id.
    pub fn new(
        id: impl Into<String>,
        assignee_id: impl Into<String>,
        task_type: TaskType,
        complexity: u8,
        original_estimate_hours: f64,
    ) -> Self {
        let id = id.into();
        let assignee_id = assignee_id.into();
        Self {
            key: id.clone(),
            id,
            assignee_name: assignee_id.clone(),
            assignee_id,
            task_type,
            complexity,
            test_note: None,
            status: String::new(),
            created_at: None,
            sprint: String::new(),
            original_estimate_hours,
            reported_spent_hours: None,
            remaining_estimate_hours: original_estimate_hours,
            total_spent_hours: 0.0,
            spent_in_sprint_hours: 0.0,
            spent_in_other_sprints_hours: 0.0,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_assignee_name(mut self, name: impl Into<String>) -> Self {
        self.assignee_name = name.into();
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_sprint(mut self, sprint: impl Into<String>) -> Self {
        self.sprint = sprint.into();
        self
    }

    pub fn with_test_note(mut self, note: f64) -> Self {
        self.test_note = Some(note);
        self
    }

    /// Test note with the unrated default applied
    pub fn effective_test_note(&self) -> f64 {
        self.test_note.unwrap_or(DEFAULT_TEST_NOTE)
    }

    pub fn is_backlog(&self) -> bool {
        self.sprint.trim().is_empty()
    }

    /// Whether a time-log task reference points at this task (id or key)
    pub fn matches_ref(&self, task_ref: &str) -> bool {
        let task_ref = task_ref.trim();
        if task_ref.is_empty() {
            return false;
        }
        task_ref == self.id.trim() || task_ref == self.key.trim()
    }
}

/// One entry of the time-log sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeLogEntry {
    /// Task id or key
    pub task_ref: String,
    #[serde(deserialize_with = "crate::schema::deserialize_log_timestamp")]
    pub logged_at: NaiveDateTime,
    pub hours: f64,
}

impl TimeLogEntry {
    pub fn new(task_ref: impl Into<String>, logged_at: NaiveDateTime, hours: f64) -> Self {
        Self {
            task_ref: task_ref.into(),
            logged_at,
            hours,
        }
    }
}

/// Sprint date window, inclusive on both ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SprintPeriod {
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SprintPeriod {
    pub fn new(name: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            name: name.into(),
            start,
            end,
        }
    }

    /// `[start 00:00:00, end 23:59:59.999]`
    pub fn contains(&self, at: &NaiveDateTime) -> bool {
        self.contains_date(&at.date())
    }

    pub fn contains_date(&self, date: &NaiveDate) -> bool {
        *date >= self.start && *date <= self.end
    }
}

/// Which reconciled hours a task is judged on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoursBasis {
    /// Spent in the sprint window vs. the estimate remaining at sprint start
    Sprint,
    /// Spent across all sprints vs. the original estimate
    Accumulated,
}

/// Which score a presentation layer wants to see
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreView {
    #[default]
    WithBonus,
    WithoutBonus,
}

/// Efficiency verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EfficiencyZone {
    Efficient,
    Acceptable,
    Inefficient,
}

impl EfficiencyZone {
    /// Credit toward the accuracy rate
    pub fn credit(&self) -> f64 {
        match self {
            EfficiencyZone::Efficient => 1.0,
            EfficiencyZone::Acceptable => 0.5,
            EfficiencyZone::Inefficient => 0.0,
        }
    }
}

/// How a task's efficiency was judged. Defects always carry
/// `ComplexityZone`, every other type always carries `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EfficiencyImpact {
    Normal {
        /// Signed estimation accuracy (%)
        deviation_pct: f64,
        /// Slowest tolerated deviation (%), negative
        slower_threshold_pct: f64,
        efficient: bool,
    },
    ComplexityZone {
        hours_spent: f64,
        max_efficient_hours: f64,
        max_acceptable_hours: f64,
        zone: EfficiencyZone,
    },
}

impl EfficiencyImpact {
    pub fn zone(&self) -> EfficiencyZone {
        match self {
            EfficiencyImpact::Normal { efficient: true, .. } => EfficiencyZone::Efficient,
            EfficiencyImpact::Normal { efficient: false, .. } => EfficiencyZone::Inefficient,
            EfficiencyImpact::ComplexityZone { zone, .. } => *zone,
        }
    }

    pub fn is_efficient(&self) -> bool {
        self.zone() == EfficiencyZone::Efficient
    }
}

/// Task-level metric for one evaluation context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPerformanceMetric {
    pub task_id: String,
    pub task_key: String,
    pub developer_id: String,
    pub task_type: TaskType,
    pub complexity: u8,
    pub sprint: String,
    pub basis: HoursBasis,
    /// Hours judged against `hours_estimated`
    pub hours_spent: f64,
    pub hours_estimated: f64,
    /// Hours logged inside the scope's windows
    pub hours_worked: f64,
    /// `(estimated - spent) / estimated * 100`, positive = faster
    pub estimation_accuracy: f64,
    /// `None` when the task has no estimate in this context
    pub efficiency: Option<EfficiencyImpact>,
    pub test_note: Option<f64>,
    pub completed: bool,
    pub fully_completed: bool,
}

impl TaskPerformanceMetric {
    pub fn zone(&self) -> Option<EfficiencyZone> {
        self.efficiency.as_ref().map(EfficiencyImpact::zone)
    }

    pub fn effective_test_note(&self) -> f64 {
        self.test_note.unwrap_or(DEFAULT_TEST_NOTE)
    }
}

/// Bonus contributions for one scope
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BonusBreakdown {
    /// Complexity 4-5 execution (0-15)
    pub seniority: f64,
    /// Complexity 3 execution (0-5)
    pub competence: f64,
    /// Peer assistance staircase
    pub assistance: f64,
    /// Tasks eligible for the seniority bonus
    pub seniority_eligible: usize,
    /// Tasks eligible for the competence bonus
    pub competence_eligible: usize,
    /// Hours counted toward the assistance bonus
    pub assistance_hours: f64,
}

impl BonusBreakdown {
    pub fn total(&self) -> f64 {
        self.seniority + self.competence + self.assistance
    }
}

/// Aggregate for one developer in one scope (sprint, custom or calendar period)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintPerformanceMetric {
    pub developer_id: String,
    pub developer_name: String,
    /// Sprint name or period id
    pub scope_id: String,
    pub sprint_names: Vec<String>,

    // Productivity
    pub total_tasks: usize,
    pub tasks_started: usize,
    pub tasks_completed: usize,
    pub tasks_fully_completed: usize,
    pub tasks_with_estimate: usize,
    pub total_hours_worked: f64,
    pub total_hours_estimated: f64,
    pub average_complexity: f64,

    // Accuracy
    pub efficient_count: usize,
    pub acceptable_count: usize,
    pub inefficient_count: usize,
    pub bug_accuracy_rate: f64,
    pub feature_accuracy_rate: f64,
    pub accuracy_rate: f64,
    pub average_estimation_accuracy: f64,

    // Quality
    pub quality_score: f64,
    pub has_quality_data: bool,

    // Informative only
    pub utilization_rate: f64,
    pub completion_rate: f64,

    // Score
    pub bonuses: BonusBreakdown,
    /// Set when the scope spans several sprints and bonuses were zeroed
    pub bonuses_suppressed: bool,
    pub base_score: f64,
    pub final_score: f64,

    pub task_metrics: Vec<TaskPerformanceMetric>,
}

impl SprintPerformanceMetric {
    pub fn score(&self, view: ScoreView) -> f64 {
        match view {
            ScoreView::WithBonus => self.final_score,
            ScoreView::WithoutBonus => self.base_score,
        }
    }
}

/// Calendar bucket size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Monthly,
    Quarterly,
    Semiannual,
    Annual,
}

/// Direction of a metric over the bucket sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

/// Mean of per-sprint metrics falling into one calendar bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalPeriodMetric {
    /// e.g. `2024-03`, `2024-Q1`, `2024-H1`, `2024`
    pub period_id: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub sprint_names: Vec<String>,
    pub sprint_count: usize,
    /// Mean final score, or mean base score once the bucket spans several sprints
    pub average_score: f64,
    pub average_base_score: f64,
    pub average_quality: f64,
    pub average_accuracy: f64,
    pub average_complexity: f64,
    pub average_utilization: f64,
    pub total_hours_worked: f64,
    pub tasks_completed: usize,
}

/// Trend per tracked metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricTrends {
    pub performance: Trend,
    pub quality: Trend,
    pub accuracy: Trend,
    pub complexity: Trend,
}

/// First-to-last bucket growth (%)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GrowthMetrics {
    pub performance_pct: f64,
    pub quality_pct: f64,
    pub accuracy_pct: f64,
    pub complexity_pct: f64,
    /// Weighted combination of the four growth figures
    pub overall_growth_score: f64,
}

/// Longitudinal view of one developer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeveloperEvolution {
    pub developer_id: String,
    pub developer_name: String,
    pub granularity: Granularity,
    pub periods: Vec<TemporalPeriodMetric>,
    pub trends: MetricTrends,
    pub growth: GrowthMetrics,
}

/// 1-based ranks within the visible developer set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeveloperRanks {
    pub overall: usize,
    pub accuracy: usize,
    pub quality: usize,
    pub hours: usize,
}

/// One developer's standing within a scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeveloperComparison {
    pub developer_id: String,
    pub developer_name: String,
    pub scope_id: String,
    pub score: f64,
    pub accuracy_rate: f64,
    pub quality_score: f64,
    pub total_hours_worked: f64,
    pub ranks: DeveloperRanks,
    pub total_developers: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_sprint_window_is_inclusive() {
        let sprint = SprintPeriod::new(
            "S1",
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        );

        assert!(sprint.contains(&at("2024-03-04", "00:00:00")));
        assert!(sprint.contains(&at("2024-03-15", "23:59:59")));
        assert!(!sprint.contains(&at("2024-03-03", "23:59:59")));
        assert!(!sprint.contains(&at("2024-03-16", "00:00:00")));
    }

    #[test]
    fn test_task_ref_matching() {
        let task = Task::new("1001", "dev-1", TaskType::Feature, 2, 8.0).with_key("PRJ-12");

        assert!(task.matches_ref("1001"));
        assert!(task.matches_ref(" PRJ-12 "));
        assert!(!task.matches_ref("prj-12"));
        assert!(!task.matches_ref(""));
    }

    #[test]
    fn test_task_type_parse() {
        assert_eq!(TaskType::parse("Defect"), TaskType::Bug);
        assert_eq!(TaskType::parse(" Support "), TaskType::Assistance);
        assert_eq!(TaskType::parse("Spike"), TaskType::Other("Spike".to_string()));
        assert!(TaskType::parse("meeting").is_neutral());
    }

    #[test]
    fn test_task_type_serde() {
        let parsed: TaskType = serde_json::from_str("\"defect\"").unwrap();
        assert_eq!(parsed, TaskType::Bug);

        let other: TaskType = serde_json::from_str("\"spike\"").unwrap();
        assert_eq!(other, TaskType::Other("spike".to_string()));

        assert_eq!(serde_json::to_string(&TaskType::Assistance).unwrap(), "\"assistance\"");
    }

    #[test]
    fn test_efficiency_zone_mapping() {
        let normal = EfficiencyImpact::Normal {
            deviation_pct: -30.0,
            slower_threshold_pct: -20.0,
            efficient: false,
        };
        assert_eq!(normal.zone(), EfficiencyZone::Inefficient);

        let zone = EfficiencyImpact::ComplexityZone {
            hours_spent: 6.0,
            max_efficient_hours: 4.0,
            max_acceptable_hours: 8.0,
            zone: EfficiencyZone::Acceptable,
        };
        assert_eq!(zone.zone().credit(), 0.5);
        assert!(!zone.is_efficient());
    }
}
