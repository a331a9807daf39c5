//! Error types for ems-routing.

use ems_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoutingError {
    /// HTTP transport failure (timeout, connection refused, 5xx).
    #[error("routing provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Provider answered but had no route between the points.
    #[error("routing provider returned no route")]
    NoRoute,

    /// Provider answered with a body we could not make sense of.
    #[error("malformed provider response: {0}")]
    Malformed(String),

    /// Provider geometry failed to decode.
    #[error("geometry error: {0}")]
    Geometry(#[from] CoreError),

    /// No unit of the required capability within the dispatch distance cap.
    /// `nearest_m` is the closest over-cap candidate seen, for operator
    /// diagnosis.
    #[error("no eligible unit within the dispatch distance cap (nearest candidate: {nearest_m:?} m)")]
    NoEligibleUnit { nearest_m: Option<f64> },
}

/// Alias for `Result<T, RoutingError>`.
pub type RoutingResult<T> = Result<T, RoutingError>;
