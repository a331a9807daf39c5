//! Error types for ems-dispatch.
//!
//! Only two kinds of failure ever reach a caller: "no eligible unit"
//! (inside [`DispatchError::Routing`]) and state/storage errors.  Routing
//! provider outages never appear here — they degrade inside ems-routing.

use thiserror::Error;

/// Errors surfaced by dispatch operations.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Store(#[from] ems_store::StoreError),

    #[error(transparent)]
    Routing(#[from] ems_routing::RoutingError),
}

/// Alias for `Result<T, DispatchError>`.
pub type DispatchResult<T> = Result<T, DispatchError>;
