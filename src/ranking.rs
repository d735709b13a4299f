//! Developer ranking
//!
//! Ranks are 1-based positions within four independent descending orderings
//! (score, accuracy, quality, hours worked). Ties keep input order. Ranks are
//! always relative to the set passed in, so filtering the visible developers
//! means ranking again.

use crate::types::{DeveloperComparison, DeveloperRanks, ScoreView, SprintPerformanceMetric};

/// Rank every metric in `metrics`, returned in input order
pub fn rank_developers(
    metrics: &[SprintPerformanceMetric],
    view: ScoreView,
) -> Vec<DeveloperComparison> {
    let refs: Vec<&SprintPerformanceMetric> = metrics.iter().collect();
    rank_refs(&refs, view)
}

/// Rank only the developers in `visible`, keeping input order
pub fn rank_visible(
    metrics: &[SprintPerformanceMetric],
    visible: &[String],
    view: ScoreView,
) -> Vec<DeveloperComparison> {
    let refs: Vec<&SprintPerformanceMetric> = metrics
        .iter()
        .filter(|m| visible.iter().any(|id| id.trim() == m.developer_id))
        .collect();
    rank_refs(&refs, view)
}

/// Comparisons sorted by overall rank
pub fn leaderboard(comparisons: &[DeveloperComparison]) -> Vec<&DeveloperComparison> {
    let mut board: Vec<&DeveloperComparison> = comparisons.iter().collect();
    board.sort_by_key(|c| c.ranks.overall);
    board
}

fn rank_refs(metrics: &[&SprintPerformanceMetric], view: ScoreView) -> Vec<DeveloperComparison> {
    let overall = ranks_by(metrics, |m| m.score(view));
    let accuracy = ranks_by(metrics, |m| m.accuracy_rate);
    let quality = ranks_by(metrics, |m| m.quality_score);
    let hours = ranks_by(metrics, |m| m.total_hours_worked);

    metrics
        .iter()
        .enumerate()
        .map(|(i, m)| DeveloperComparison {
            developer_id: m.developer_id.clone(),
            developer_name: m.developer_name.clone(),
            scope_id: m.scope_id.clone(),
            score: m.score(view),
            accuracy_rate: m.accuracy_rate,
            quality_score: m.quality_score,
            total_hours_worked: m.total_hours_worked,
            ranks: DeveloperRanks {
                overall: overall[i],
                accuracy: accuracy[i],
                quality: quality[i],
                hours: hours[i],
            },
            total_developers: metrics.len(),
        })
        .collect()
}

/// Rank of each input position under a descending stable sort on `key`.
/// NaN sorts below every number.
fn ranks_by(
    metrics: &[&SprintPerformanceMetric],
    key: impl Fn(&SprintPerformanceMetric) -> f64,
) -> Vec<usize> {
    let keys: Vec<f64> = metrics.iter().map(|m| sort_key(key(m))).collect();
    let mut order: Vec<usize> = (0..metrics.len()).collect();
    order.sort_by(|&a, &b| keys[b].total_cmp(&keys[a]));

    let mut ranks = vec![0; metrics.len()];
    for (position, index) in order.into_iter().enumerate() {
        ranks[index] = position + 1;
    }
    ranks
}

fn sort_key(value: f64) -> f64 {
    if value.is_nan() {
        f64::NEG_INFINITY
    } else {
        // folds -0.0 into 0.0 so zeros tie
        value + 0.0
    }
}
