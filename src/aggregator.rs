//! Sprint aggregation
//!
//! This module folds one developer's reconciled tasks in one scope into a
//! [`SprintPerformanceMetric`]:
//! - Productivity: task counts, hours worked and estimated, utilization
//! - Accuracy: efficient plus half-credit acceptable over judged tasks
//! - Quality: average test note scaled to 0-100
//! - Score: base (quality + accuracy) plus capped bonuses
//!
//! Only fully completed tasks feed accuracy, quality and bonuses; every task
//! in scope still counts toward hours worked.

use crate::bonus::BonusEngine;
use crate::config::MetricsConfig;
use crate::task_metrics::TaskEvaluator;
use crate::types::{
    BonusBreakdown, EfficiencyZone, HoursBasis, SprintPerformanceMetric, Task,
    TaskPerformanceMetric,
};
use serde::{Deserialize, Serialize};

/// What an aggregate covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    /// Sprint name, custom period id or calendar bucket id
    pub id: String,
    pub sprint_names: Vec<String>,
    pub basis: HoursBasis,
}

impl Scope {
    /// A single sprint judged on in-window hours
    pub fn sprint(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            sprint_names: vec![name],
            basis: HoursBasis::Sprint,
        }
    }

    /// Several sprints judged on accumulated hours
    pub fn custom(id: impl Into<String>, sprint_names: Vec<String>) -> Self {
        Self {
            id: id.into(),
            sprint_names,
            basis: HoursBasis::Accumulated,
        }
    }

    pub fn spans_multiple_sprints(&self) -> bool {
        self.sprint_names.len() > 1
    }

    pub fn includes(&self, sprint: &str) -> bool {
        let sprint = sprint.trim();
        self.sprint_names.iter().any(|s| s.trim() == sprint)
    }
}

/// Sprint/period aggregator
pub struct SprintAggregator;

impl SprintAggregator {
    /// Aggregate one developer's reconciled tasks already restricted to `scope`
    pub fn aggregate(
        developer_id: &str,
        tasks: &[&Task],
        scope: &Scope,
        config: &MetricsConfig,
    ) -> SprintPerformanceMetric {
        let task_metrics: Vec<TaskPerformanceMetric> = tasks
            .iter()
            .map(|task| TaskEvaluator::evaluate(task, scope.basis, config))
            .collect();

        let developer_name = tasks
            .iter()
            .map(|t| t.assignee_name.trim())
            .find(|name| !name.is_empty())
            .unwrap_or(developer_id)
            .to_string();

        let tasks_started = tasks
            .iter()
            .zip(&task_metrics)
            .filter(|(task, metric)| {
                !config.is_not_started(&task.status) || metric.hours_worked > 0.0
            })
            .count();
        let tasks_completed = task_metrics.iter().filter(|m| m.completed).count();
        let tasks_with_estimate = task_metrics
            .iter()
            .filter(|m| m.hours_estimated > 0.0)
            .count();
        let total_hours_worked: f64 = task_metrics.iter().map(|m| m.hours_worked).sum();
        let total_hours_estimated: f64 = task_metrics.iter().map(|m| m.hours_estimated).sum();

        let delivered: Vec<&TaskPerformanceMetric> =
            task_metrics.iter().filter(|m| m.fully_completed).collect();
        let average_complexity = mean(delivered.iter().map(|m| m.complexity as f64));

        let accuracy = AccuracyTally::from_metrics(&delivered);

        let quality_notes: Vec<f64> = delivered
            .iter()
            .filter(|m| !m.task_type.is_neutral())
            .map(|m| m.effective_test_note())
            .collect();
        let has_quality_data = !quality_notes.is_empty();
        let quality_score = quality_score(&quality_notes);

        let accuracy_rate = accuracy.blended_rate();
        let base_score = base_score(quality_score, accuracy_rate, has_quality_data);

        let (bonuses, bonuses_suppressed) = if scope.spans_multiple_sprints() {
            // Bonuses belong to a single sprint's work and are not summed across sprints
            (BonusBreakdown::default(), true)
        } else {
            (BonusEngine::evaluate(&task_metrics, config), false)
        };
        let final_score = (base_score + bonuses.total()).min(config.max_score_with_bonus());

        let capacity = config.capacity_for(developer_id) * scope.sprint_names.len().max(1) as f64;
        let utilization_rate = ratio_pct(total_hours_worked, capacity);
        let completion_rate = ratio_pct(tasks_completed as f64, tasks_started as f64);

        SprintPerformanceMetric {
            developer_id: developer_id.to_string(),
            developer_name,
            scope_id: scope.id.clone(),
            sprint_names: scope.sprint_names.clone(),
            total_tasks: tasks.len(),
            tasks_started,
            tasks_completed,
            tasks_fully_completed: delivered.len(),
            tasks_with_estimate,
            total_hours_worked,
            total_hours_estimated,
            average_complexity,
            efficient_count: accuracy.efficient(),
            acceptable_count: accuracy.acceptable(),
            inefficient_count: accuracy.inefficient(),
            bug_accuracy_rate: accuracy.bugs.rate(),
            feature_accuracy_rate: accuracy.features.rate(),
            accuracy_rate,
            average_estimation_accuracy: accuracy.average_estimation_accuracy(),
            quality_score,
            has_quality_data,
            utilization_rate,
            completion_rate,
            bonuses,
            bonuses_suppressed,
            base_score,
            final_score,
            task_metrics,
        }
    }
}

/// Verdict counts for one rule system
#[derive(Debug, Clone, Copy, Default)]
struct ZoneCounts {
    efficient: usize,
    acceptable: usize,
    inefficient: usize,
}

impl ZoneCounts {
    fn judged(&self) -> usize {
        self.efficient + self.acceptable + self.inefficient
    }

    fn credit(&self) -> f64 {
        self.efficient as f64 + 0.5 * self.acceptable as f64
    }

    fn rate(&self) -> f64 {
        ratio_pct(self.credit(), self.judged() as f64)
    }
}

/// Accuracy counts split by rule system
#[derive(Debug, Default)]
struct AccuracyTally {
    bugs: ZoneCounts,
    features: ZoneCounts,
    deviation_sum: f64,
}

impl AccuracyTally {
    fn from_metrics(metrics: &[&TaskPerformanceMetric]) -> Self {
        let mut tally = AccuracyTally::default();
        for metric in metrics {
            let Some(zone) = metric.zone() else {
                continue;
            };
            let counts = if metric.task_type.is_defect() {
                &mut tally.bugs
            } else {
                &mut tally.features
            };
            match zone {
                EfficiencyZone::Efficient => counts.efficient += 1,
                EfficiencyZone::Acceptable => counts.acceptable += 1,
                EfficiencyZone::Inefficient => counts.inefficient += 1,
            }
            tally.deviation_sum += metric.estimation_accuracy;
        }
        tally
    }

    fn efficient(&self) -> usize {
        self.bugs.efficient + self.features.efficient
    }

    fn acceptable(&self) -> usize {
        self.bugs.acceptable + self.features.acceptable
    }

    fn inefficient(&self) -> usize {
        self.bugs.inefficient + self.features.inefficient
    }

    fn judged(&self) -> usize {
        self.bugs.judged() + self.features.judged()
    }

    /// Both rule systems weighted by their judged counts
    fn blended_rate(&self) -> f64 {
        ratio_pct(self.bugs.credit() + self.features.credit(), self.judged() as f64)
    }

    fn average_estimation_accuracy(&self) -> f64 {
        if self.judged() == 0 {
            return 0.0;
        }
        self.deviation_sum / self.judged() as f64
    }
}

/// Average note x 20, clamped to 0-100
pub fn quality_score(notes: &[f64]) -> f64 {
    if notes.is_empty() {
        return 0.0;
    }
    let average = notes.iter().sum::<f64>() / notes.len() as f64;
    (average * 20.0).clamp(0.0, 100.0)
}

/// Half quality, half accuracy; accuracy alone without quality data
pub fn base_score(quality_score: f64, accuracy_rate: f64, has_quality_data: bool) -> f64 {
    let score = if has_quality_data {
        0.5 * quality_score + 0.5 * accuracy_rate
    } else {
        accuracy_rate
    };
    score.clamp(0.0, 100.0)
}

/// `part / whole * 100`, 0 when `whole` is not positive
pub fn ratio_pct(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        (part / whole) * 100.0
    } else {
        0.0
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Developers owning at least one task, in order of first appearance
pub fn developer_roster<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Vec<(String, String)> {
    let mut roster: Vec<(String, String)> = Vec::new();
    for task in tasks {
        let id = task.assignee_id.trim();
        if id.is_empty() || roster.iter().any(|(seen, _)| seen == id) {
            continue;
        }
        let name = if task.assignee_name.trim().is_empty() {
            id
        } else {
            task.assignee_name.trim()
        };
        roster.push((id.to_string(), name.to_string()));
    }
    roster
}
