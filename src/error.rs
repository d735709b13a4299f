//! Error types for Sprint Pulse
//!
//! The scoring core never fails; these errors come from the surfaces that
//! touch serialized input or output (snapshots, configuration, reports).

use thiserror::Error;

/// Errors that can occur while loading inputs or encoding outputs
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse snapshot: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Date parse error: {0}")]
    DateParseError(String),
}
