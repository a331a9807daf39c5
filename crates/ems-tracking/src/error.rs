//! Error types for ems-tracking.

use thiserror::Error;

/// Errors that can occur in tracking and simulation.
#[derive(Debug, Error)]
pub enum TrackingError {
    /// The assignment feed (normally the dispatch store) failed for one
    /// simulator tick.
    #[error("assignment feed error: {0}")]
    Feed(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Alias for `Result<T, TrackingError>`.
pub type TrackingResult<T> = Result<T, TrackingError>;
