//! Custom multi-sprint periods
//!
//! A custom period is an explicit selection of sprints. Its metrics are
//! re-derived from the union of the selected sprints' tasks rather than
//! combined from per-sprint scores, so a task carried across several of the
//! selected sprints is judged once on its accumulated hours.
//!
//! Bonuses are a property of a single sprint's work. Whenever the selection
//! spans more than one sprint they are reported as zero and the final score
//! equals the base score.

use crate::aggregator::{developer_roster, Scope, SprintAggregator};
use crate::config::MetricsConfig;
use crate::reconciler::{reconcile_within, sprint_windows, TimeLogIndex};
use crate::schema::Snapshot;
use crate::types::{SprintPerformanceMetric, SprintPeriod, Task};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Caller-defined selection of sprints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomPeriod {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub sprint_names: Vec<String>,
}

impl CustomPeriod {
    pub fn new(id: impl Into<String>, sprint_names: Vec<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            sprint_names,
        }
    }

    /// Scope used for aggregation.
    ///
    /// Blank and repeated names are dropped. A one-sprint selection behaves
    /// like that sprint.
    pub fn scope(&self) -> Scope {
        let mut names: Vec<String> = Vec::new();
        for name in self.sprint_names.iter().map(|n| n.trim()) {
            if !name.is_empty() && !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }

        match names.as_slice() {
            [single] => Scope {
                id: self.id.clone(),
                ..Scope::sprint(single.clone())
            },
            _ => Scope::custom(self.id.clone(), names),
        }
    }
}

/// Aggregator over custom periods of one snapshot.
///
/// Tasks of the selected sprints are pooled first and then reconciled
/// against the union of the selected windows, so hours logged outside the
/// selection never count as worked.
pub struct PeriodAggregator<'a> {
    snapshot: &'a Snapshot,
    index: TimeLogIndex<'a>,
    windows: HashMap<&'a str, &'a SprintPeriod>,
}

impl<'a> PeriodAggregator<'a> {
    pub fn new(snapshot: &'a Snapshot) -> Self {
        Self {
            snapshot,
            index: TimeLogIndex::new(&snapshot.time_logs),
            windows: sprint_windows(&snapshot.sprints),
        }
    }

    /// Metrics for every developer owning a task in the period
    pub fn aggregate(
        &self,
        period: &CustomPeriod,
        config: &MetricsConfig,
    ) -> Vec<SprintPerformanceMetric> {
        let scope = period.scope();
        if scope.sprint_names.is_empty() {
            return Vec::new();
        }

        let pooled = self.reconciled_pool(&scope);
        debug!(
            "period {}: {} pooled tasks across {} sprints",
            period.id,
            pooled.len(),
            scope.sprint_names.len()
        );

        developer_roster(&pooled)
            .into_iter()
            .map(|(developer_id, _)| {
                let owned: Vec<&Task> = pooled
                    .iter()
                    .filter(|t| t.assignee_id.trim() == developer_id)
                    .collect();
                SprintAggregator::aggregate(&developer_id, &owned, &scope, config)
            })
            .collect()
    }

    /// Metrics for one developer, `None` when they own no task in the period
    pub fn aggregate_developer(
        &self,
        developer_id: &str,
        period: &CustomPeriod,
        config: &MetricsConfig,
    ) -> Option<SprintPerformanceMetric> {
        let scope = period.scope();
        if scope.sprint_names.is_empty() {
            return None;
        }

        let developer_id = developer_id.trim();
        let pooled = self.reconciled_pool(&scope);
        let owned: Vec<&Task> = pooled
            .iter()
            .filter(|t| t.assignee_id.trim() == developer_id)
            .collect();

        if owned.is_empty() {
            return None;
        }
        Some(SprintAggregator::aggregate(developer_id, &owned, &scope, config))
    }

    fn reconciled_pool(&self, scope: &Scope) -> Vec<Task> {
        let windows: Vec<&SprintPeriod> = scope
            .sprint_names
            .iter()
            .filter_map(|name| {
                let window = self.windows.get(name.as_str()).copied();
                if window.is_none() {
                    warn!("sprint '{}' of scope {} has no date window", name, scope.id);
                }
                window
            })
            .collect();

        pooled_tasks(&self.snapshot.tasks, scope)
            .into_iter()
            .map(|task| reconcile_within(task, &self.index, &windows))
            .collect()
    }
}

/// Tasks of the selected sprints, one row per task (last row wins).
///
/// Rows are matched by key, or by id when the key is blank. Rows with
/// neither stay separate.
fn pooled_tasks<'t>(tasks: &'t [Task], scope: &Scope) -> Vec<&'t Task> {
    let mut pooled: Vec<&'t Task> = Vec::new();
    let mut position: HashMap<&'t str, usize> = HashMap::new();

    for task in tasks.iter().filter(|t| scope.includes(&t.sprint)) {
        let Some(identity) = pool_key(task) else {
            pooled.push(task);
            continue;
        };
        match position.get(identity) {
            Some(&at) => pooled[at] = task,
            None => {
                position.insert(identity, pooled.len());
                pooled.push(task);
            }
        }
    }
    pooled
}

fn pool_key(task: &Task) -> Option<&str> {
    [task.key.trim(), task.id.trim()]
        .into_iter()
        .find(|candidate| !candidate.is_empty())
}
