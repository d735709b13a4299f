//! Report encoding
//!
//! Wraps computed metrics in an envelope carrying producer metadata and a
//! generation timestamp, and encodes it to JSON.

use crate::aggregator::Scope;
use crate::error::ComputeError;
use crate::types::{
    DeveloperComparison, DeveloperEvolution, Granularity, ScoreView, SprintPerformanceMetric,
};
use crate::{PRODUCER_NAME, PULSE_VERSION};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Attached to multi-sprint reports, where bonuses are not computed
pub const BONUS_SUPPRESSED_NOTICE: &str =
    "Bonuses apply to single sprints only; final scores for this scope equal base scores.";

/// Who produced a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Scope-level report: per-developer metrics plus their comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub producer: ReportProducer,
    pub generated_at_utc: String,
    pub scope_id: String,
    pub sprint_names: Vec<String>,
    pub score_view: ScoreView,
    pub developers: Vec<SprintPerformanceMetric>,
    pub comparisons: Vec<DeveloperComparison>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

/// Longitudinal report over calendar buckets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionReport {
    pub producer: ReportProducer,
    pub generated_at_utc: String,
    pub granularity: Granularity,
    pub developers: Vec<DeveloperEvolution>,
}

/// Encoder producing report envelopes
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Wrap scope metrics and comparisons in a report.
    ///
    /// Identity and the bonus notice come from `scope`, so a scope with no
    /// developers still reports what was selected.
    pub fn encode_scope(
        &self,
        scope: &Scope,
        metrics: Vec<SprintPerformanceMetric>,
        comparisons: Vec<DeveloperComparison>,
        view: ScoreView,
    ) -> MetricsReport {
        MetricsReport {
            producer: self.producer(),
            generated_at_utc: Utc::now().to_rfc3339(),
            scope_id: scope.id.clone(),
            sprint_names: scope.sprint_names.clone(),
            score_view: view,
            developers: metrics,
            comparisons,
            notice: scope
                .spans_multiple_sprints()
                .then(|| BONUS_SUPPRESSED_NOTICE.to_string()),
        }
    }

    pub fn encode_evolution(
        &self,
        granularity: Granularity,
        developers: Vec<DeveloperEvolution>,
    ) -> EvolutionReport {
        EvolutionReport {
            producer: self.producer(),
            generated_at_utc: Utc::now().to_rfc3339(),
            granularity,
            developers,
        }
    }

    /// Encode any report to a JSON string
    pub fn to_json<T: Serialize>(report: &T, pretty: bool) -> Result<String, ComputeError> {
        let encoded = if pretty {
            serde_json::to_string_pretty(report)
        } else {
            serde_json::to_string(report)
        };
        encoded.map_err(ComputeError::JsonError)
    }

    fn producer(&self) -> ReportProducer {
        ReportProducer {
            name: PRODUCER_NAME.to_string(),
            version: PULSE_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        }
    }
}
