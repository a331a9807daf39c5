//! Error types for ems-traffic.

use ems_core::{CoreError, SegmentId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrafficError {
    #[error("traffic segment {segment} has {got} points, need at least 2")]
    TooFewPoints { segment: SegmentId, got: usize },

    #[error("CSV read error: {0}")]
    Csv(#[from] csv::Error),

    #[error("geometry error: {0}")]
    Geometry(#[from] CoreError),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias for `Result<T, TrafficError>`.
pub type TrafficResult<T> = Result<T, TrafficError>;
