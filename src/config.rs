//! Scoring configuration
//!
//! Every threshold table the scoring stages read lives here and is passed in
//! explicitly. Tables are serde-serializable so they can be edited as JSON
//! without code changes; missing fields fall back to the documented defaults.

use crate::error::ComputeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lowest and highest complexity levels
pub const MIN_COMPLEXITY: u8 = 1;
pub const MAX_COMPLEXITY: u8 = 5;

/// Default minimum test note for a task to earn bonuses
pub const DEFAULT_QUALITY_GATE: f64 = 4.0;

/// Default bonus caps
pub const DEFAULT_SENIORITY_CAP: f64 = 15.0;
pub const DEFAULT_COMPETENCE_CAP: f64 = 5.0;
pub const DEFAULT_ASSISTANCE_CAP: f64 = 10.0;

/// Default hours a developer is expected to work per sprint
pub const DEFAULT_WEEKLY_CAPACITY_HOURS: f64 = 40.0;
pub const DEFAULT_INTERN_CAPACITY_HOURS: f64 = 20.0;

/// Minimum |slope| for a regression to count as a trend
pub const DEFAULT_TREND_SLOPE_THRESHOLD: f64 = 0.5;

/// Absolute-hour caps for one complexity level (defect path)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplexityZone {
    pub max_efficient_hours: f64,
    pub max_acceptable_hours: f64,
}

impl ComplexityZone {
    pub fn new(max_efficient_hours: f64, max_acceptable_hours: f64) -> Self {
        Self {
            max_efficient_hours,
            max_acceptable_hours,
        }
    }
}

/// Deviation tolerance for one complexity level (non-defect path)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviationTolerance {
    /// Slowest accepted estimation accuracy in percent (negative)
    pub slower_pct: f64,
}

impl DeviationTolerance {
    pub fn new(slower_pct: f64) -> Self {
        Self { slower_pct }
    }
}

/// One step of the peer-assistance staircase
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssistanceTier {
    pub min_hours: f64,
    pub points: f64,
}

impl AssistanceTier {
    pub fn new(min_hours: f64, points: f64) -> Self {
        Self { min_hours, points }
    }
}

/// Weights of the growth score (should sum to 1.0)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthWeights {
    pub performance: f64,
    pub quality: f64,
    pub accuracy: f64,
    pub complexity: f64,
}

impl Default for GrowthWeights {
    fn default() -> Self {
        Self {
            performance: 0.4,
            quality: 0.3,
            accuracy: 0.2,
            complexity: 0.1,
        }
    }
}

/// Injected configuration for every scoring stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Defect hour caps by complexity
    pub complexity_zones: BTreeMap<u8, ComplexityZone>,
    /// Non-defect deviation floors by complexity
    pub deviation_tolerances: BTreeMap<u8, DeviationTolerance>,
    /// Ordered by `min_hours`; highest tier met wins
    pub assistance_tiers: Vec<AssistanceTier>,
    pub assistance_cap: f64,
    pub seniority_cap: f64,
    pub competence_cap: f64,
    /// Minimum test note for bonus eligibility
    pub quality_gate: f64,
    pub weekly_capacity_hours: f64,
    pub intern_capacity_hours: f64,
    /// Developer ids measured against `intern_capacity_hours`
    pub intern_developers: Vec<String>,
    /// Closed statuses; only these feed accuracy, quality and bonuses
    pub fully_completed_statuses: Vec<String>,
    /// Broader "done" set used for completion counts
    pub completed_statuses: Vec<String>,
    /// Statuses meaning work never started
    pub not_started_statuses: Vec<String>,
    pub trend_slope_threshold: f64,
    pub growth_weights: GrowthWeights,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        let complexity_zones = BTreeMap::from([
            (1, ComplexityZone::new(2.0, 4.0)),
            (2, ComplexityZone::new(4.0, 8.0)),
            (3, ComplexityZone::new(8.0, 12.0)),
            (4, ComplexityZone::new(12.0, 20.0)),
            (5, ComplexityZone::new(20.0, 32.0)),
        ]);

        let deviation_tolerances = BTreeMap::from([
            (1, DeviationTolerance::new(-10.0)),
            (2, DeviationTolerance::new(-15.0)),
            (3, DeviationTolerance::new(-20.0)),
            (4, DeviationTolerance::new(-30.0)),
            (5, DeviationTolerance::new(-40.0)),
        ]);

        Self {
            complexity_zones,
            deviation_tolerances,
            assistance_tiers: vec![
                AssistanceTier::new(2.0, 2.0),
                AssistanceTier::new(4.0, 4.0),
                AssistanceTier::new(8.0, 6.0),
                AssistanceTier::new(12.0, 8.0),
                AssistanceTier::new(16.0, 10.0),
            ],
            assistance_cap: DEFAULT_ASSISTANCE_CAP,
            seniority_cap: DEFAULT_SENIORITY_CAP,
            competence_cap: DEFAULT_COMPETENCE_CAP,
            quality_gate: DEFAULT_QUALITY_GATE,
            weekly_capacity_hours: DEFAULT_WEEKLY_CAPACITY_HOURS,
            intern_capacity_hours: DEFAULT_INTERN_CAPACITY_HOURS,
            intern_developers: Vec::new(),
            fully_completed_statuses: to_strings(&["done", "closed", "resolved"]),
            completed_statuses: to_strings(&[
                "done",
                "closed",
                "resolved",
                "in review",
                "code review",
                "testing",
                "in test",
                "ready for deploy",
            ]),
            not_started_statuses: to_strings(&["to do", "todo", "open", "backlog", "new"]),
            trend_slope_threshold: DEFAULT_TREND_SLOPE_THRESHOLD,
            growth_weights: GrowthWeights::default(),
        }
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn status_in(set: &[String], status: &str) -> bool {
    let status = status.trim();
    set.iter().any(|s| s.trim().eq_ignore_ascii_case(status))
}

impl MetricsConfig {
    /// Zone caps for a complexity level; out-of-range levels are clamped
    pub fn zone_for(&self, complexity: u8) -> Option<&ComplexityZone> {
        self.complexity_zones.get(&clamp_complexity(complexity))
    }

    /// Deviation tolerance for a complexity level; out-of-range levels are clamped
    pub fn tolerance_for(&self, complexity: u8) -> Option<&DeviationTolerance> {
        self.deviation_tolerances.get(&clamp_complexity(complexity))
    }

    pub fn is_fully_completed(&self, status: &str) -> bool {
        status_in(&self.fully_completed_statuses, status)
    }

    pub fn is_completed(&self, status: &str) -> bool {
        status_in(&self.completed_statuses, status) || self.is_fully_completed(status)
    }

    pub fn is_not_started(&self, status: &str) -> bool {
        status.trim().is_empty() || status_in(&self.not_started_statuses, status)
    }

    /// Hours per sprint the developer is measured against
    pub fn capacity_for(&self, developer_id: &str) -> f64 {
        if self.intern_developers.iter().any(|d| d == developer_id) {
            self.intern_capacity_hours
        } else {
            self.weekly_capacity_hours
        }
    }

    /// Highest score reachable with every bonus maxed
    pub fn max_score_with_bonus(&self) -> f64 {
        100.0 + self.seniority_cap + self.competence_cap + self.assistance_cap
    }

    /// Check table completeness and internal consistency
    pub fn validate(&self) -> Result<(), ComputeError> {
        for level in MIN_COMPLEXITY..=MAX_COMPLEXITY {
            let zone = self.complexity_zones.get(&level).ok_or_else(|| {
                ComputeError::InvalidConfig(format!("missing complexity zone for level {level}"))
            })?;
            if zone.max_efficient_hours < 0.0
                || zone.max_acceptable_hours < zone.max_efficient_hours
            {
                return Err(ComputeError::InvalidConfig(format!(
                    "complexity zone {level}: need 0 <= efficient ({}) <= acceptable ({})",
                    zone.max_efficient_hours, zone.max_acceptable_hours
                )));
            }

            let tolerance = self.deviation_tolerances.get(&level).ok_or_else(|| {
                ComputeError::InvalidConfig(format!(
                    "missing deviation tolerance for level {level}"
                ))
            })?;
            if tolerance.slower_pct > 0.0 {
                return Err(ComputeError::InvalidConfig(format!(
                    "deviation tolerance {level}: slower_pct must be <= 0, got {}",
                    tolerance.slower_pct
                )));
            }
        }

        if self
            .assistance_tiers
            .windows(2)
            .any(|w| w[1].min_hours <= w[0].min_hours)
        {
            return Err(ComputeError::InvalidConfig(
                "assistance tiers must be strictly ordered by min_hours".to_string(),
            ));
        }

        if self.weekly_capacity_hours <= 0.0 || self.intern_capacity_hours <= 0.0 {
            return Err(ComputeError::InvalidConfig(
                "capacity hours must be positive".to_string(),
            ));
        }

        if self.seniority_cap < 0.0 || self.competence_cap < 0.0 || self.assistance_cap < 0.0 {
            return Err(ComputeError::InvalidConfig(
                "bonus caps must not be negative".to_string(),
            ));
        }

        Ok(())
    }

    /// Load configuration from JSON; absent fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: MetricsConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to pretty JSON
    pub fn to_json(&self) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(self).map_err(ComputeError::JsonError)
    }
}

fn clamp_complexity(complexity: u8) -> u8 {
    complexity.clamp(MIN_COMPLEXITY, MAX_COMPLEXITY)
}
