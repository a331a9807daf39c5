//! `ems-store` — SQLite persistence for units, incidents, and cached routes.
//!
//! The store is the single writer for dispatch state.  Its two compound
//! operations are transactions:
//!
//! | Operation          | Effects, atomically                                  |
//! |--------------------|------------------------------------------------------|
//! | [`Store::assign`]  | gate statuses, unit → `DISPATCHED`, incident → `ASSIGNED`, deactivate the unit's stale route, insert the new active route |
//! | [`Store::complete`]| incident → `COMPLETED`, unit → `AVAILABLE`, deactivate the incident's routes |
//!
//! Route rows are deactivated, never deleted, on redispatch and completion;
//! [`Store::purge_inactive_older_than`] is optional housekeeping.  Waypoint
//! lists are capped at 245 points before insertion and stored as JSON.

pub mod error;
pub mod records;
pub mod store;


pub use error::{StoreError, StoreResult};
pub use records::{
    AssignmentRecorded, CompletionRecorded, IncidentRecord, NewRoute, RouteRecord, UnitRecord,
};
pub use store::Store;
