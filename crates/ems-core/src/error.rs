//! Core error type.
//!
//! Sub-crates define their own error enums and either convert `CoreError`
//! into them via `From` impls or wrap it as one variant.  Both patterns are
//! acceptable; prefer whichever keeps error sites clean.

use thiserror::Error;

/// Errors raised by the geometry and codec primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid polyline: {0}")]
    InvalidPolyline(String),
}

/// Shorthand result type for `ems-core`.
pub type CoreResult<T> = Result<T, CoreError>;
