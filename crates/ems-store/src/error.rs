//! Error types for ems-store.

use thiserror::Error;

use ems_core::{IncidentId, IncidentStatus, UnitId, UnitStatus};

/// Errors that can occur in the dispatch store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("waypoint serialization error: {0}")]
    Waypoints(#[from] serde_json::Error),

    #[error("no such unit: {0}")]
    UnitNotFound(UnitId),

    #[error("no such incident: {0}")]
    IncidentNotFound(IncidentId),

    /// Status gate on dispatch: the unit is already committed elsewhere.
    #[error("{unit} is {status}, not AVAILABLE")]
    UnitNotAvailable { unit: UnitId, status: UnitStatus },

    /// Status gate on dispatch: the incident is not open for assignment.
    #[error("{incident} is {status}, cannot be assigned")]
    IncidentNotOpen { incident: IncidentId, status: IncidentStatus },

    /// Status gate on completion.
    #[error("{incident} is {status}, cannot be completed")]
    IncidentNotAssigned { incident: IncidentId, status: IncidentStatus },

    /// A persisted enum column holds a spelling no variant claims.
    #[error("invalid {column} value {value:?} in stored row")]
    Column { column: &'static str, value: String },
}

/// Alias for `Result<T, StoreError>`.
pub type StoreResult<T> = Result<T, StoreError>;
