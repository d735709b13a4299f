//! Task metric calculation
//!
//! This module judges a single reconciled task:
//! - Estimation accuracy as a signed percentage (positive = faster than estimated)
//! - Efficiency verdict, by one of two rule systems chosen from the task type:
//!   defects use absolute-hour complexity zones, everything else uses a
//!   deviation tolerance with no middle zone
//!
//! Tasks without an estimate in the chosen context get no verdict.

use crate::config::MetricsConfig;
use crate::types::{EfficiencyImpact, EfficiencyZone, HoursBasis, Task, TaskPerformanceMetric};
use log::warn;

/// Evaluator producing task-level metrics
pub struct TaskEvaluator;

impl TaskEvaluator {
    /// Evaluate a reconciled task on the given hours basis
    pub fn evaluate(
        task: &Task,
        basis: HoursBasis,
        config: &MetricsConfig,
    ) -> TaskPerformanceMetric {
        let (hours_spent, hours_estimated) = hours_for(task, basis);
        let estimation_accuracy = estimation_accuracy(hours_estimated, hours_spent);
        let efficiency = if hours_estimated > 0.0 {
            classify_efficiency(task, hours_spent, estimation_accuracy, config)
        } else {
            None
        };

        TaskPerformanceMetric {
            task_id: task.id.clone(),
            task_key: task.key.clone(),
            developer_id: task.assignee_id.clone(),
            task_type: task.task_type.clone(),
            complexity: task.complexity,
            sprint: task.sprint.clone(),
            basis,
            hours_spent,
            hours_estimated,
            hours_worked: task.spent_in_sprint_hours,
            estimation_accuracy,
            efficiency,
            test_note: task.test_note,
            completed: config.is_completed(&task.status),
            fully_completed: config.is_fully_completed(&task.status),
        }
    }
}

/// `(spent, estimated)` for the chosen basis
fn hours_for(task: &Task, basis: HoursBasis) -> (f64, f64) {
    match basis {
        HoursBasis::Sprint => (task.spent_in_sprint_hours, task.remaining_estimate_hours),
        HoursBasis::Accumulated => (task.total_spent_hours, task.original_estimate_hours),
    }
}

/// `((estimated - spent) / estimated) * 100`, or 0 without an estimate
pub fn estimation_accuracy(estimated: f64, spent: f64) -> f64 {
    if estimated > 0.0 {
        ((estimated - spent) / estimated) * 100.0
    } else {
        0.0
    }
}

/// Pick the rule system from the task type and apply it
fn classify_efficiency(
    task: &Task,
    hours_spent: f64,
    estimation_accuracy: f64,
    config: &MetricsConfig,
) -> Option<EfficiencyImpact> {
    if task.task_type.is_defect() {
        let Some(zone) = config.zone_for(task.complexity) else {
            warn!("no complexity zone for level {} (task {})", task.complexity, task.key);
            return None;
        };
        let verdict = if hours_spent <= zone.max_efficient_hours {
            EfficiencyZone::Efficient
        } else if hours_spent <= zone.max_acceptable_hours {
            EfficiencyZone::Acceptable
        } else {
            EfficiencyZone::Inefficient
        };
        Some(EfficiencyImpact::ComplexityZone {
            hours_spent,
            max_efficient_hours: zone.max_efficient_hours,
            max_acceptable_hours: zone.max_acceptable_hours,
            zone: verdict,
        })
    } else {
        let Some(tolerance) = config.tolerance_for(task.complexity) else {
            warn!("no deviation tolerance for level {} (task {})", task.complexity, task.key);
            return None;
        };
        let efficient = estimation_accuracy > 0.0 || estimation_accuracy >= tolerance.slower_pct;
        Some(EfficiencyImpact::Normal {
            deviation_pct: estimation_accuracy,
            slower_threshold_pct: tolerance.slower_pct,
            efficient,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ComplexityZone, DeviationTolerance};
    use crate::types::TaskType;

    fn config() -> MetricsConfig {
        let mut config = MetricsConfig::default();
        config.complexity_zones.insert(3, ComplexityZone::new(4.0, 8.0));
        config.deviation_tolerances.insert(2, DeviationTolerance::new(-20.0));
        config
    }

    fn spent(task: Task, hours: f64) -> Task {
        let mut task = task;
        task.spent_in_sprint_hours = hours;
        task.total_spent_hours = hours;
        task
    }

    #[test]
    fn test_defect_zones_ignore_estimate() {
        let config = config();
        for estimate in [1.0, 5.0, 50.0] {
            let bug = Task::new("B-1", "dev-1", TaskType::Bug, 3, estimate).with_status("Done");
            let zone = |hours| {
                TaskEvaluator::evaluate(&spent(bug.clone(), hours), HoursBasis::Sprint, &config)
                    .zone()
            };

            assert_eq!(zone(3.0), Some(EfficiencyZone::Efficient));
            assert_eq!(zone(6.0), Some(EfficiencyZone::Acceptable));
            assert_eq!(zone(10.0), Some(EfficiencyZone::Inefficient));
        }
    }

    #[test]
    fn test_defect_zone_bounds_inclusive() {
        let config = config();
        let bug = Task::new("B-1", "dev-1", TaskType::Bug, 3, 6.0);

        let at_efficient =
            TaskEvaluator::evaluate(&spent(bug.clone(), 4.0), HoursBasis::Sprint, &config);
        let at_acceptable = TaskEvaluator::evaluate(&spent(bug, 8.0), HoursBasis::Sprint, &config);

        assert_eq!(at_efficient.zone(), Some(EfficiencyZone::Efficient));
        assert_eq!(at_acceptable.zone(), Some(EfficiencyZone::Acceptable));
    }

    #[test]
    fn test_feature_deviation_tolerance() {
        let config = config();
        let feature = Task::new("F-1", "dev-1", TaskType::Feature, 2, 10.0);

        let faster =
            TaskEvaluator::evaluate(&spent(feature.clone(), 8.0), HoursBasis::Sprint, &config);
        assert!((faster.estimation_accuracy - 20.0).abs() < 1e-9);
        assert_eq!(faster.zone(), Some(EfficiencyZone::Efficient));

        let too_slow =
            TaskEvaluator::evaluate(&spent(feature.clone(), 13.0), HoursBasis::Sprint, &config);
        assert!((too_slow.estimation_accuracy + 30.0).abs() < 1e-9);
        assert_eq!(too_slow.zone(), Some(EfficiencyZone::Inefficient));

        let within = TaskEvaluator::evaluate(&spent(feature, 11.0), HoursBasis::Sprint, &config);
        assert!((within.estimation_accuracy + 10.0).abs() < 1e-9);
        assert_eq!(within.zone(), Some(EfficiencyZone::Efficient));
    }

    #[test]
    fn test_feature_never_acceptable() {
        let config = config();
        let feature = Task::new("F-1", "dev-1", TaskType::Story, 2, 10.0);

        for hours in [0.0, 5.0, 10.0, 12.0, 12.5, 30.0] {
            let metric = TaskEvaluator::evaluate(
                &spent(feature.clone(), hours),
                HoursBasis::Sprint,
                &config,
            );
            assert_ne!(metric.zone(), Some(EfficiencyZone::Acceptable));
            assert!(matches!(metric.efficiency, Some(EfficiencyImpact::Normal { .. })));
        }
    }

    #[test]
    fn test_zero_estimate_has_no_verdict() {
        let config = config();
        let bug = Task::new("B-1", "dev-1", TaskType::Bug, 3, 0.0);
        let metric = TaskEvaluator::evaluate(&spent(bug, 2.0), HoursBasis::Sprint, &config);

        assert_eq!(metric.estimation_accuracy, 0.0);
        assert!(metric.efficiency.is_none());
    }

    #[test]
    fn test_basis_selects_hours() {
        let config = config();
        let mut task = Task::new("F-1", "dev-1", TaskType::Feature, 2, 10.0);
        task.spent_in_sprint_hours = 4.0;
        task.spent_in_other_sprints_hours = 6.0;
        task.total_spent_hours = 10.0;
        task.remaining_estimate_hours = 4.0;

        let sprint = TaskEvaluator::evaluate(&task, HoursBasis::Sprint, &config);
        assert_eq!((sprint.hours_spent, sprint.hours_estimated), (4.0, 4.0));

        let accumulated = TaskEvaluator::evaluate(&task, HoursBasis::Accumulated, &config);
        assert_eq!((accumulated.hours_spent, accumulated.hours_estimated), (10.0, 10.0));
        assert_eq!(accumulated.hours_worked, 4.0);
    }

    #[test]
    fn test_completion_flags_follow_status_sets() {
        let config = config();
        let reviewing =
            Task::new("F-1", "dev-1", TaskType::Feature, 2, 10.0).with_status("In Review");
        let metric = TaskEvaluator::evaluate(&reviewing, HoursBasis::Sprint, &config);

        assert!(metric.completed);
        assert!(!metric.fully_completed);
    }
}
