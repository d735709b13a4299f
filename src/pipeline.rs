//! Pipeline orchestration
//!
//! This module provides the public API for Sprint Pulse.
//! It orchestrates the full pipeline from a snapshot to scored metrics.

use crate::aggregator::developer_roster;
use crate::arena::MetricsArena;
use crate::config::MetricsConfig;
use crate::error::ComputeError;
use crate::period::{CustomPeriod, PeriodAggregator};
use crate::ranking::{rank_developers, rank_visible};
use crate::reconciler::reconcile_all;
use crate::report::{MetricsReport, ReportEncoder};
use crate::schema::{Snapshot, SnapshotAdapter};
use crate::temporal::{CalendarBucket, TemporalAggregator};
use crate::types::{
    DeveloperComparison, DeveloperEvolution, Granularity, ScoreView, SprintPerformanceMetric,
    SprintPeriod, Task,
};
use chrono::NaiveDate;
use log::debug;

/// Score one sprint of a snapshot document and encode the report as JSON.
///
/// # Arguments
/// * `snapshot_json` - Snapshot document (`tasks`, `time_logs`, `sprints`)
/// * `sprint` - Sprint name
/// * `view` - Which score drives the overall ranking
///
/// # Example
/// ```ignore
/// let report = sprint_report_json(&snapshot_json, "Sprint 12", ScoreView::WithBonus)?;
/// ```
pub fn sprint_report_json(
    snapshot_json: &str,
    sprint: &str,
    view: ScoreView,
) -> Result<String, ComputeError> {
    let snapshot = SnapshotAdapter::parse_json(snapshot_json)?;
    let processor = MetricsProcessor::new();
    let report = processor.sprint_report(&snapshot, sprint, view);
    ReportEncoder::to_json(&report, true)
}

/// Processor holding the scoring configuration.
///
/// Every operation is a pure function of the snapshot passed in; the
/// processor keeps no state between calls.
pub struct MetricsProcessor {
    config: MetricsConfig,
    encoder: ReportEncoder,
}

impl Default for MetricsProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsProcessor {
    /// Create a processor with the default configuration
    pub fn new() -> Self {
        Self::with_config(MetricsConfig::default())
    }

    pub fn with_config(config: MetricsConfig) -> Self {
        Self {
            config,
            encoder: ReportEncoder::new(),
        }
    }

    /// Create a processor from a (possibly partial) JSON configuration
    pub fn with_config_json(json: &str) -> Result<Self, ComputeError> {
        Ok(Self::with_config(MetricsConfig::from_json(json)?))
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    /// Reconcile every task of the snapshot against its sprint window
    pub fn reconcile(&self, snapshot: &Snapshot) -> Vec<Task> {
        reconcile_all(&snapshot.tasks, &snapshot.time_logs, &snapshot.sprints)
    }

    /// Metrics for every developer owning a task in `sprint`.
    ///
    /// An unknown or blank sprint name yields no metrics.
    pub fn sprint_metrics(
        &self,
        snapshot: &Snapshot,
        sprint: &str,
    ) -> Vec<SprintPerformanceMetric> {
        PeriodAggregator::new(snapshot).aggregate(&single_sprint(sprint), &self.config)
    }

    /// Metrics for one developer in one sprint, `None` when they own no task there
    pub fn developer_sprint_metric(
        &self,
        snapshot: &Snapshot,
        developer_id: &str,
        sprint: &str,
    ) -> Option<SprintPerformanceMetric> {
        PeriodAggregator::new(snapshot).aggregate_developer(
            developer_id,
            &single_sprint(sprint),
            &self.config,
        )
    }

    /// Metrics for every developer over a custom selection of sprints
    pub fn custom_period_metrics(
        &self,
        snapshot: &Snapshot,
        period: &CustomPeriod,
    ) -> Vec<SprintPerformanceMetric> {
        PeriodAggregator::new(snapshot).aggregate(period, &self.config)
    }

    /// Dated sprints starting in the calendar bucket that contains `date`,
    /// as a period named after the bucket
    pub fn calendar_period(
        &self,
        snapshot: &Snapshot,
        granularity: Granularity,
        date: NaiveDate,
    ) -> Option<CustomPeriod> {
        let bucket = CalendarBucket::containing(date, granularity)?;
        let sprint_names: Vec<String> = snapshot
            .dated_sprints()
            .into_iter()
            .filter(|sprint| bucket.contains(sprint.start))
            .map(|sprint| sprint.name.trim().to_string())
            .collect();
        debug!("bucket {} holds {} sprints", bucket.id, sprint_names.len());
        Some(CustomPeriod::new(bucket.id, sprint_names))
    }

    /// Metrics for every developer over one calendar bucket
    pub fn calendar_period_metrics(
        &self,
        snapshot: &Snapshot,
        granularity: Granularity,
        date: NaiveDate,
    ) -> Vec<SprintPerformanceMetric> {
        match self.calendar_period(snapshot, granularity, date) {
            Some(period) => self.custom_period_metrics(snapshot, &period),
            None => Vec::new(),
        }
    }

    /// Evolution of one developer across calendar buckets, `None` when they
    /// own no task in any dated sprint
    pub fn developer_evolution(
        &self,
        snapshot: &Snapshot,
        developer_id: &str,
        granularity: Granularity,
    ) -> Option<DeveloperEvolution> {
        let aggregator = PeriodAggregator::new(snapshot);
        self.evolution_with(&aggregator, snapshot, developer_id.trim(), granularity)
    }

    /// Evolution of every developer in the snapshot, in order of first appearance
    pub fn team_evolution(
        &self,
        snapshot: &Snapshot,
        granularity: Granularity,
    ) -> Vec<DeveloperEvolution> {
        let aggregator = PeriodAggregator::new(snapshot);
        developer_roster(&snapshot.tasks)
            .into_iter()
            .filter_map(|(developer_id, _)| {
                self.evolution_with(&aggregator, snapshot, &developer_id, granularity)
            })
            .collect()
    }

    /// Every (developer, sprint) metric of the snapshot
    pub fn build_arena(&self, snapshot: &Snapshot) -> MetricsArena {
        let aggregator = PeriodAggregator::new(snapshot);
        let mut arena = MetricsArena::new();
        for sprint in snapshot.dated_sprints() {
            for metric in aggregator.aggregate(&single_sprint(&sprint.name), &self.config) {
                arena.insert(metric);
            }
        }
        debug!("arena holds {} metrics", arena.len());
        arena
    }

    /// Rank metrics of one scope, optionally restricted to `visible` developers
    pub fn compare(
        &self,
        metrics: &[SprintPerformanceMetric],
        visible: Option<&[String]>,
        view: ScoreView,
    ) -> Vec<DeveloperComparison> {
        match visible {
            Some(ids) => rank_visible(metrics, ids, view),
            None => rank_developers(metrics, view),
        }
    }

    /// Sprint metrics plus comparisons wrapped in a report envelope
    pub fn sprint_report(
        &self,
        snapshot: &Snapshot,
        sprint: &str,
        view: ScoreView,
    ) -> MetricsReport {
        self.period_report(snapshot, &single_sprint(sprint), view)
    }

    /// Custom-period metrics plus comparisons wrapped in a report envelope
    pub fn period_report(
        &self,
        snapshot: &Snapshot,
        period: &CustomPeriod,
        view: ScoreView,
    ) -> MetricsReport {
        let metrics = self.custom_period_metrics(snapshot, period);
        let comparisons = self.compare(&metrics, None, view);
        self.encoder.encode_scope(&period.scope(), metrics, comparisons, view)
    }

    pub fn encoder(&self) -> &ReportEncoder {
        &self.encoder
    }

    fn evolution_with(
        &self,
        aggregator: &PeriodAggregator<'_>,
        snapshot: &Snapshot,
        developer_id: &str,
        granularity: Granularity,
    ) -> Option<DeveloperEvolution> {
        let per_sprint: Vec<(&SprintPeriod, SprintPerformanceMetric)> = snapshot
            .dated_sprints()
            .into_iter()
            .filter_map(|sprint| {
                let period = single_sprint(&sprint.name);
                aggregator
                    .aggregate_developer(developer_id, &period, &self.config)
                    .map(|metric| (sprint, metric))
            })
            .collect();

        let first = per_sprint.first()?;
        let developer_name = first.1.developer_name.clone();
        debug!(
            "evolution for {}: {} sprints at {:?} granularity",
            developer_id,
            per_sprint.len(),
            granularity
        );

        let pairs: Vec<(&SprintPeriod, &SprintPerformanceMetric)> =
            per_sprint.iter().map(|(sprint, metric)| (*sprint, metric)).collect();
        Some(TemporalAggregator::evolution(
            developer_id,
            &developer_name,
            &pairs,
            granularity,
            &self.config,
        ))
    }
}

fn single_sprint(sprint: &str) -> CustomPeriod {
    let sprint = sprint.trim();
    CustomPeriod::new(sprint, vec![sprint.to_string()])
}
