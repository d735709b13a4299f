//! Sprint Pulse - sprint performance reconciliation and scoring engine
//!
//! Pulse turns a snapshot of tasks, time logs and sprint windows into
//! per-developer performance metrics through a deterministic pipeline:
//! time reconciliation → task metrics → sprint aggregation (with bonuses)
//! → cross-period rollups → ranking.
//!
//! ## Modules
//!
//! - **Scoring core**: reconciler, task metrics, bonus engine, aggregator
//! - **Longitudinal views**: custom periods and calendar-bucket evolution
//! - **Comparison**: multi-ordering developer ranking

pub mod aggregator;
pub mod arena;
pub mod bonus;
pub mod config;
pub mod error;
pub mod period;
pub mod pipeline;
pub mod ranking;
pub mod reconciler;
pub mod report;
pub mod schema;
pub mod task_metrics;
pub mod temporal;
pub mod types;

pub use arena::MetricsArena;
pub use config::MetricsConfig;
pub use error::ComputeError;
pub use period::CustomPeriod;
pub use pipeline::{sprint_report_json, MetricsProcessor};

// Schema exports
pub use schema::{Snapshot, SnapshotAdapter, ValidationIssue};

/// Pulse version embedded in all reports
pub const PULSE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "sprint-pulse";
