//! `ems-core` — foundational types for the `rust_ems` dispatch system.
//!
//! This crate is a dependency of every other `ems-*` crate.  It intentionally
//! has no `ems-*` dependencies and minimal external ones (only `thiserror`
//! and `serde`).
//!
//! # What lives here
//!
//! | Module       | Contents                                                 |
//! |--------------|----------------------------------------------------------|
//! | [`ids`]      | `UnitId`, `IncidentId`, `RouteId`, `SegmentId`           |
//! | [`geo`]      | `GeoPoint`, haversine, segment projection, resampling    |
//! | [`polyline`] | Encoded-polyline codec, waypoint-cap sampling            |
//! | [`kinds`]    | `ServiceKind`, `UnitStatus`, `IncidentStatus`, `JamLevel`, `LegStatus` |
//! | [`error`]    | `CoreError`, `CoreResult`                                |

pub mod error;
pub mod geo;
pub mod ids;
pub mod kinds;
pub mod polyline;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{CoreError, CoreResult};
pub use geo::{GeoPoint, SegmentProjection};
pub use ids::{IncidentId, RouteId, SegmentId, UnitId};
pub use kinds::{IncidentStatus, JamLevel, LegStatus, ServiceKind, UnitStatus};
pub use polyline::MAX_WAYPOINTS;
