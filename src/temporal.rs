//! Calendar rollups and developer evolution
//!
//! This module groups a developer's per-sprint metrics into calendar buckets
//! (month, quarter, semester, year) keyed by sprint start date, and derives:
//! - Per-bucket arithmetic means of the sprint metrics
//! - A least-squares trend per metric over the ordered buckets
//! - First-to-last bucket growth, weighted into one growth score

use crate::config::MetricsConfig;
use crate::types::{
    DeveloperEvolution, Granularity, GrowthMetrics, MetricTrends, SprintPerformanceMetric,
    SprintPeriod, TemporalPeriodMetric, Trend,
};
use chrono::{Datelike, NaiveDate};
use log::warn;

/// Calendar bucket containing a date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarBucket {
    pub id: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CalendarBucket {
    /// Bucket of the given granularity containing `date`
    pub fn containing(date: NaiveDate, granularity: Granularity) -> Option<Self> {
        let year = date.year();
        let month = date.month();

        let (id, first_month, months) = match granularity {
            Granularity::Monthly => (format!("{year}-{month:02}"), month, 1),
            Granularity::Quarterly => {
                let quarter = (month - 1) / 3 + 1;
                (format!("{year}-Q{quarter}"), (quarter - 1) * 3 + 1, 3)
            }
            Granularity::Semiannual => {
                let half = if month <= 6 { 1 } else { 2 };
                (format!("{year}-H{half}"), (half - 1) * 6 + 1, 6)
            }
            Granularity::Annual => (format!("{year}"), 1, 12),
        };

        let start = NaiveDate::from_ymd_opt(year, first_month, 1)?;
        let next_month = first_month + months;
        let next_start = if next_month > 12 {
            NaiveDate::from_ymd_opt(year + 1, next_month - 12, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, next_month, 1)?
        };
        let end = next_start.pred_opt()?;

        Some(Self { id, start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Builder of temporal rollups
pub struct TemporalAggregator;

impl TemporalAggregator {
    /// Group per-sprint metrics into calendar buckets, ordered by bucket start
    pub fn periods(
        per_sprint: &[(&SprintPeriod, &SprintPerformanceMetric)],
        granularity: Granularity,
    ) -> Vec<TemporalPeriodMetric> {
        let mut grouped: Vec<(CalendarBucket, Vec<(&SprintPeriod, &SprintPerformanceMetric)>)> =
            Vec::new();

        for &(sprint, metric) in per_sprint {
            let Some(bucket) = CalendarBucket::containing(sprint.start, granularity) else {
                warn!("sprint {} start {} has no calendar bucket", sprint.name, sprint.start);
                continue;
            };
            match grouped.iter_mut().find(|(b, _)| b.id == bucket.id) {
                Some((_, members)) => members.push((sprint, metric)),
                None => grouped.push((bucket, vec![(sprint, metric)])),
            }
        }

        grouped.sort_by_key(|(bucket, _)| bucket.start);
        grouped
            .into_iter()
            .map(|(bucket, members)| period_metric(bucket, &members))
            .collect()
    }

    /// Evolution of one developer across calendar buckets
    pub fn evolution(
        developer_id: &str,
        developer_name: &str,
        per_sprint: &[(&SprintPeriod, &SprintPerformanceMetric)],
        granularity: Granularity,
        config: &MetricsConfig,
    ) -> DeveloperEvolution {
        let periods = Self::periods(per_sprint, granularity);

        let series = |f: fn(&TemporalPeriodMetric) -> f64| -> Vec<f64> {
            periods.iter().map(f).collect()
        };
        let performance = series(|p| p.average_score);
        let quality = series(|p| p.average_quality);
        let accuracy = series(|p| p.average_accuracy);
        let complexity = series(|p| p.average_complexity);

        let threshold = config.trend_slope_threshold;
        let trends = MetricTrends {
            performance: classify_trend(&performance, threshold),
            quality: classify_trend(&quality, threshold),
            accuracy: classify_trend(&accuracy, threshold),
            complexity: classify_trend(&complexity, threshold),
        };

        let growth = if periods.len() < 2 {
            GrowthMetrics::default()
        } else {
            let performance_pct = first_to_last_growth(&performance);
            let quality_pct = first_to_last_growth(&quality);
            let accuracy_pct = first_to_last_growth(&accuracy);
            let complexity_pct = first_to_last_growth(&complexity);
            let weights = &config.growth_weights;
            GrowthMetrics {
                performance_pct,
                quality_pct,
                accuracy_pct,
                complexity_pct,
                overall_growth_score: performance_pct * weights.performance
                    + quality_pct * weights.quality
                    + accuracy_pct * weights.accuracy
                    + complexity_pct * weights.complexity,
            }
        };

        DeveloperEvolution {
            developer_id: developer_id.to_string(),
            developer_name: developer_name.to_string(),
            granularity,
            periods,
            trends,
            growth,
        }
    }
}

fn period_metric(
    bucket: CalendarBucket,
    members: &[(&SprintPeriod, &SprintPerformanceMetric)],
) -> TemporalPeriodMetric {
    let count = members.len();
    let mean = |f: fn(&SprintPerformanceMetric) -> f64| -> f64 {
        if count == 0 {
            0.0
        } else {
            members.iter().map(|(_, m)| f(m)).sum::<f64>() / count as f64
        }
    };

    TemporalPeriodMetric {
        period_id: bucket.id,
        start: bucket.start,
        end: bucket.end,
        sprint_names: members.iter().map(|(s, _)| s.name.clone()).collect(),
        sprint_count: count,
        // a bucket spanning several sprints is a multi-sprint scope: no bonuses
        average_score: if count > 1 {
            mean(|m| m.base_score)
        } else {
            mean(|m| m.final_score)
        },
        average_base_score: mean(|m| m.base_score),
        average_quality: mean(|m| m.quality_score),
        average_accuracy: mean(|m| m.accuracy_rate),
        average_complexity: mean(|m| m.average_complexity),
        average_utilization: mean(|m| m.utilization_rate),
        total_hours_worked: members.iter().map(|(_, m)| m.total_hours_worked).sum(),
        tasks_completed: members.iter().map(|(_, m)| m.tasks_completed).sum(),
    }
}

/// Least-squares slope of `values` against their index
pub fn regression_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let n_f = n as f64;
    let mean_x = (n_f - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n_f;

    let (numerator, denominator) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(num, den), (i, y)| {
            let dx = i as f64 - mean_x;
            (num + dx * (y - mean_y), den + dx * dx)
        });

    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Trending only when |slope| exceeds the threshold
pub fn classify_trend(values: &[f64], threshold: f64) -> Trend {
    let slope = regression_slope(values);
    if slope > threshold {
        Trend::Improving
    } else if slope < -threshold {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

/// Percentage change between two values; from zero, any rise counts as 100%
pub fn growth_pct(first: f64, last: f64) -> f64 {
    if first == 0.0 {
        if last > 0.0 {
            100.0
        } else {
            0.0
        }
    } else {
        ((last - first) / first.abs()) * 100.0
    }
}

fn first_to_last_growth(values: &[f64]) -> f64 {
    match (values.first(), values.last()) {
        (Some(first), Some(last)) => growth_pct(*first, *last),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BonusBreakdown;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sprint_metric(
        name: &str,
        score: f64,
        quality: f64,
        accuracy: f64,
        complexity: f64,
    ) -> SprintPerformanceMetric {
        SprintPerformanceMetric {
            developer_id: "dev-1".to_string(),
            developer_name: "Dev One".to_string(),
            scope_id: name.to_string(),
            sprint_names: vec![name.to_string()],
            total_tasks: 2,
            tasks_started: 2,
            tasks_completed: 2,
            tasks_fully_completed: 2,
            tasks_with_estimate: 2,
            total_hours_worked: 30.0,
            total_hours_estimated: 32.0,
            average_complexity: complexity,
            efficient_count: 2,
            acceptable_count: 0,
            inefficient_count: 0,
            bug_accuracy_rate: accuracy,
            feature_accuracy_rate: accuracy,
            accuracy_rate: accuracy,
            average_estimation_accuracy: 0.0,
            quality_score: quality,
            has_quality_data: true,
            utilization_rate: 75.0,
            completion_rate: 100.0,
            bonuses: BonusBreakdown::default(),
            bonuses_suppressed: false,
            base_score: score,
            final_score: score,
            task_metrics: Vec::new(),
        }
    }

    #[test]
    fn test_bucket_ids_and_bounds() {
        let d = date(2024, 5, 17);

        let month = CalendarBucket::containing(d, Granularity::Monthly).unwrap();
        assert_eq!(month.id, "2024-05");
        assert_eq!((month.start, month.end), (date(2024, 5, 1), date(2024, 5, 31)));

        let quarter = CalendarBucket::containing(d, Granularity::Quarterly).unwrap();
        assert_eq!(quarter.id, "2024-Q2");
        assert_eq!((quarter.start, quarter.end), (date(2024, 4, 1), date(2024, 6, 30)));

        let half = CalendarBucket::containing(date(2024, 11, 2), Granularity::Semiannual).unwrap();
        assert_eq!(half.id, "2024-H2");
        assert_eq!(half.end, date(2024, 12, 31));

        let year = CalendarBucket::containing(d, Granularity::Annual).unwrap();
        assert_eq!(year.id, "2024");
        assert_eq!((year.start, year.end), (date(2024, 1, 1), date(2024, 12, 31)));

        let feb = CalendarBucket::containing(date(2024, 2, 10), Granularity::Monthly).unwrap();
        assert_eq!(feb.end, date(2024, 2, 29));
    }

    #[test]
    fn test_regression_slope() {
        assert_eq!(regression_slope(&[]), 0.0);
        assert_eq!(regression_slope(&[42.0]), 0.0);
        assert!((regression_slope(&[1.0, 2.0, 3.0, 4.0]) - 1.0).abs() < 1e-9);
        assert!((regression_slope(&[10.0, 8.0, 6.0]) + 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_trend_threshold() {
        assert_eq!(classify_trend(&[70.0, 70.4, 70.8], 0.5), Trend::Stable);
        assert_eq!(classify_trend(&[70.0, 71.0, 72.0], 0.5), Trend::Improving);
        assert_eq!(classify_trend(&[72.0, 71.0, 70.0], 0.5), Trend::Declining);
        // Exactly at threshold is not trending
        assert_eq!(classify_trend(&[70.0, 70.5], 0.5), Trend::Stable);
    }

    #[test]
    fn test_growth_pct() {
        assert_eq!(growth_pct(50.0, 75.0), 50.0);
        assert_eq!(growth_pct(80.0, 60.0), -25.0);
        assert_eq!(growth_pct(0.0, 10.0), 100.0);
        assert_eq!(growth_pct(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_monthly_means_and_evolution() {
        let config = MetricsConfig::default();
        let s1 = SprintPeriod::new("S1", date(2024, 1, 1), date(2024, 1, 14));
        let s2 = SprintPeriod::new("S2", date(2024, 1, 15), date(2024, 1, 28));
        let s3 = SprintPeriod::new("S3", date(2024, 2, 5), date(2024, 2, 18));
        let m1 = sprint_metric("S1", 60.0, 80.0, 40.0, 2.0);
        let m2 = sprint_metric("S2", 80.0, 80.0, 80.0, 2.0);
        let m3 = sprint_metric("S3", 90.0, 100.0, 80.0, 3.0);

        let per_sprint = vec![(&s3, &m3), (&s1, &m1), (&s2, &m2)];
        let evolution = TemporalAggregator::evolution(
            "dev-1",
            "Dev One",
            &per_sprint,
            Granularity::Monthly,
            &config,
        );

        assert_eq!(evolution.periods.len(), 2);
        let jan = &evolution.periods[0];
        assert_eq!(jan.period_id, "2024-01");
        assert_eq!(jan.sprint_count, 2);
        assert_eq!(jan.average_score, 70.0);
        assert_eq!(jan.average_accuracy, 60.0);
        assert_eq!(jan.total_hours_worked, 60.0);
        assert_eq!(jan.tasks_completed, 4);

        assert_eq!(evolution.trends.performance, Trend::Improving);
        assert_eq!(evolution.trends.quality, Trend::Improving);

        // 70 -> 90, 80 -> 100, 60 -> 80, 2 -> 3
        let growth = evolution.growth;
        assert!((growth.performance_pct - 200.0 / 7.0).abs() < 1e-9);
        assert_eq!(growth.quality_pct, 25.0);
        assert!((growth.accuracy_pct - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(growth.complexity_pct, 50.0);
        let expected = 0.4 * (200.0 / 7.0) + 0.3 * 25.0 + 0.2 * (100.0 / 3.0) + 0.1 * 50.0;
        assert!((growth.overall_growth_score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_single_bucket_is_stable_without_growth() {
        let config = MetricsConfig::default();
        let s1 = SprintPeriod::new("S1", date(2024, 1, 1), date(2024, 1, 14));
        let m1 = sprint_metric("S1", 60.0, 80.0, 40.0, 2.0);

        let evolution = TemporalAggregator::evolution(
            "dev-1",
            "Dev One",
            &[(&s1, &m1)],
            Granularity::Annual,
            &config,
        );

        assert_eq!(evolution.periods.len(), 1);
        assert_eq!(evolution.trends.performance, Trend::Stable);
        assert_eq!(evolution.growth, GrowthMetrics::default());
    }

    #[test]
    fn test_multi_sprint_bucket_scores_without_bonuses() {
        let s1 = SprintPeriod::new("S1", date(2024, 1, 1), date(2024, 1, 14));
        let s2 = SprintPeriod::new("S2", date(2024, 1, 15), date(2024, 1, 28));
        let s3 = SprintPeriod::new("S3", date(2024, 2, 5), date(2024, 2, 18));
        let mut m1 = sprint_metric("S1", 60.0, 80.0, 40.0, 2.0);
        m1.final_score = 75.0;
        let mut m2 = sprint_metric("S2", 80.0, 80.0, 80.0, 2.0);
        m2.final_score = 95.0;
        let mut m3 = sprint_metric("S3", 70.0, 80.0, 60.0, 2.0);
        m3.final_score = 80.0;

        let periods = TemporalAggregator::periods(
            &[(&s1, &m1), (&s2, &m2), (&s3, &m3)],
            Granularity::Monthly,
        );

        assert_eq!(periods[0].average_score, 70.0);
        assert_eq!(periods[0].average_base_score, 70.0);
        assert_eq!(periods[1].average_score, 80.0);
        assert_eq!(periods[1].average_base_score, 70.0);
    }

    #[test]
    fn test_bucket_contains() {
        let q1 = CalendarBucket::containing(date(2024, 2, 10), Granularity::Quarterly).unwrap();

        assert!(q1.contains(date(2024, 1, 1)));
        assert!(q1.contains(date(2024, 3, 31)));
        assert!(!q1.contains(date(2024, 4, 1)));
    }
}
