//! Bonus computation
//!
//! Three independent, capped contributions on top of the base score:
//! - Seniority: share of complexity 4-5 tasks judged efficient
//! - Competence: share of complexity 3 tasks judged efficient
//! - Assistance: staircase lookup on hours spent helping teammates
//!
//! Every contribution only considers fully completed tasks with an estimate
//! whose test note clears the quality gate.

use crate::config::MetricsConfig;
use crate::types::{BonusBreakdown, TaskPerformanceMetric};

/// Complexity levels feeding the seniority bonus
const SENIORITY_MIN_COMPLEXITY: u8 = 4;
/// Complexity level feeding the competence bonus
const COMPETENCE_COMPLEXITY: u8 = 3;

/// Bonus evaluator
pub struct BonusEngine;

impl BonusEngine {
    /// Evaluate all bonuses for one developer's task metrics in one sprint
    pub fn evaluate(metrics: &[TaskPerformanceMetric], config: &MetricsConfig) -> BonusBreakdown {
        let gated: Vec<&TaskPerformanceMetric> = metrics
            .iter()
            .filter(|m| passes_quality_gate(m, config))
            .collect();

        let (seniority, seniority_eligible) = efficiency_bonus(
            gated
                .iter()
                .copied()
                .filter(|m| m.complexity >= SENIORITY_MIN_COMPLEXITY),
            config.seniority_cap,
        );

        let (competence, competence_eligible) = efficiency_bonus(
            gated
                .iter()
                .copied()
                .filter(|m| m.complexity == COMPETENCE_COMPLEXITY),
            config.competence_cap,
        );

        let assistance_hours: f64 = gated
            .iter()
            .filter(|m| m.task_type.is_assistance())
            .map(|m| m.hours_spent)
            .sum();
        let assistance = assistance_points(assistance_hours, config);

        BonusBreakdown {
            seniority,
            competence,
            assistance,
            seniority_eligible,
            competence_eligible,
            assistance_hours,
        }
    }
}

/// Fully completed, estimated, and rated at or above the gate
pub fn passes_quality_gate(metric: &TaskPerformanceMetric, config: &MetricsConfig) -> bool {
    metric.fully_completed
        && metric.hours_estimated > 0.0
        && metric.efficiency.is_some()
        && metric.effective_test_note() >= config.quality_gate
}

/// `round(efficient / eligible * cap)`, 0 when nothing is eligible
fn efficiency_bonus<'a>(
    eligible: impl Iterator<Item = &'a TaskPerformanceMetric>,
    cap: f64,
) -> (f64, usize) {
    let (efficient, total) = eligible.fold((0usize, 0usize), |(efficient, total), m| {
        let hit = m.efficiency.as_ref().is_some_and(|e| e.is_efficient());
        (efficient + usize::from(hit), total + 1)
    });

    if total == 0 {
        return (0.0, 0);
    }
    let bonus = ((efficient as f64 / total as f64) * cap).round();
    (bonus.min(cap), total)
}

/// Highest tier met wins; tiers are not additive
pub fn assistance_points(hours: f64, config: &MetricsConfig) -> f64 {
    config
        .assistance_tiers
        .iter()
        .filter(|tier| hours >= tier.min_hours)
        .map(|tier| tier.points)
        .fold(0.0, f64::max)
        .min(config.assistance_cap)
}
