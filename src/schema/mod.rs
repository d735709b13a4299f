//! Snapshot input schema
//!
//! A snapshot is the in-memory picture the pipeline works on: the task list,
//! the time-log sheet and the sprint calendar. This module defines its JSON
//! form, NDJSON loading for time logs, and a best-effort validation report.

mod snapshot;

pub use snapshot::*;
