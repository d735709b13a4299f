//! Metric arena
//!
//! Flat storage for sprint/period metrics with O(1) lookup by
//! `(developer_id, scope_id)`, replacing nested scope -> developer maps.

use crate::types::SprintPerformanceMetric;
use std::collections::HashMap;

/// Arena of metric records keyed by developer and scope
#[derive(Debug, Clone, Default)]
pub struct MetricsArena {
    records: Vec<SprintPerformanceMetric>,
    index: HashMap<(String, String), usize>,
}

impl MetricsArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, replacing any record with the same key
    pub fn insert(&mut self, metric: SprintPerformanceMetric) -> usize {
        let key = (metric.developer_id.clone(), metric.scope_id.clone());
        match self.index.get(&key) {
            Some(&slot) => {
                self.records[slot] = metric;
                slot
            }
            None => {
                let slot = self.records.len();
                self.records.push(metric);
                self.index.insert(key, slot);
                slot
            }
        }
    }

    pub fn get(&self, developer_id: &str, scope_id: &str) -> Option<&SprintPerformanceMetric> {
        self.index
            .get(&(developer_id.to_string(), scope_id.to_string()))
            .map(|&slot| &self.records[slot])
    }

    /// Records of one scope, in insertion order
    pub fn scope(&self, scope_id: &str) -> Vec<&SprintPerformanceMetric> {
        self.records.iter().filter(|m| m.scope_id == scope_id).collect()
    }

    /// Records of one developer, in insertion order
    pub fn developer(&self, developer_id: &str) -> Vec<&SprintPerformanceMetric> {
        self.records
            .iter()
            .filter(|m| m.developer_id == developer_id)
            .collect()
    }

    /// Distinct scope ids, in order of first insertion
    pub fn scope_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for metric in &self.records {
            if !ids.contains(&metric.scope_id.as_str()) {
                ids.push(metric.scope_id.as_str());
            }
        }
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &SprintPerformanceMetric> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<SprintPerformanceMetric> for MetricsArena {
    fn from_iter<I: IntoIterator<Item = SprintPerformanceMetric>>(iter: I) -> Self {
        let mut arena = MetricsArena::new();
        for metric in iter {
            arena.insert(metric);
        }
        arena
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{Scope, SprintAggregator};
    use crate::config::MetricsConfig;
    use crate::types::{Task, TaskType};

    fn metric(developer: &str, sprint: &str, hours: f64) -> SprintPerformanceMetric {
        let mut task = Task::new("T-1", developer, TaskType::Task, 1, 4.0).with_sprint(sprint);
        task.spent_in_sprint_hours = hours;
        let config = MetricsConfig::default();
        SprintAggregator::aggregate(developer, &[&task], &Scope::sprint(sprint), &config)
    }

    #[test]
    fn test_lookup_by_composite_key() {
        let arena: MetricsArena = vec![
            metric("dev-1", "S1", 10.0),
            metric("dev-2", "S1", 20.0),
            metric("dev-1", "S2", 30.0),
        ]
        .into_iter()
        .collect();

        assert_eq!(arena.len(), 3);
        assert_eq!(arena.get("dev-1", "S2").unwrap().total_hours_worked, 30.0);
        assert!(arena.get("dev-2", "S2").is_none());
        assert_eq!(arena.scope("S1").len(), 2);
        assert_eq!(arena.developer("dev-1").len(), 2);
        assert_eq!(arena.scope_ids(), vec!["S1", "S2"]);
    }

    #[test]
    fn test_insert_replaces_same_key() {
        let mut arena = MetricsArena::new();
        let first = arena.insert(metric("dev-1", "S1", 10.0));
        let second = arena.insert(metric("dev-1", "S1", 12.0));

        assert_eq!(first, second);
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.get("dev-1", "S1").unwrap().total_hours_worked, 12.0);
    }
}
