//! Persisted row types.
//!
//! Statuses and kinds are stored as their SCREAMING_SNAKE strings (the
//! `as_str` spellings in `ems_core::kinds`); waypoint lists are stored as a
//! JSON coordinate array, capped at 245 points before insertion.

use ems_core::{GeoPoint, IncidentId, IncidentStatus, RouteId, ServiceKind, UnitId, UnitStatus};

/// A dispatchable vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitRecord {
    pub id:        UnitId,
    /// Operator-facing vehicle identifier ("MEDIC-7").
    pub call_sign: String,
    pub kind:      ServiceKind,
    pub status:    UnitStatus,
    pub position:  GeoPoint,
}

/// A reported emergency.  Intake creates these; the dispatch core only moves
/// them `Pending`/`Approved` → `Assigned` → `Completed`.
#[derive(Debug, Clone, PartialEq)]
pub struct IncidentRecord {
    pub id:            IncidentId,
    pub kind:          ServiceKind,
    pub status:        IncidentStatus,
    pub location:      GeoPoint,
    pub assigned_unit: Option<UnitId>,
    /// Unix seconds.
    pub created_at:    i64,
}

/// One cached route, as read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRecord {
    pub id:             RouteId,
    pub unit:           UnitId,
    pub incident:       Option<IncidentId>,
    /// Encoded polyline; `None` for a geometry-less fallback dispatch.
    pub geometry:       Option<String>,
    /// Display waypoints, at most 245.
    pub waypoints:      Vec<GeoPoint>,
    pub distance_m:     f64,
    /// `None` when only a haversine distance was available.
    pub duration_s:     Option<f64>,
    pub start:          GeoPoint,
    pub end:            GeoPoint,
    /// Provenance tag ("osrm_full_geometry" / "euclidean_fallback").
    pub routing_source: String,
    pub active:         bool,
    /// Unix seconds.
    pub created_at:     i64,
}

/// Input shape for recording a dispatch; the store assigns id, timestamp,
/// and the active flag.
#[derive(Debug, Clone)]
pub struct NewRoute {
    pub unit:           UnitId,
    pub incident:       IncidentId,
    pub geometry:       Option<String>,
    pub waypoints:      Vec<GeoPoint>,
    pub distance_m:     f64,
    pub duration_s:     Option<f64>,
    pub start:          GeoPoint,
    pub end:            GeoPoint,
    pub routing_source: String,
}

/// What `Store::assign` changed, for logging and the dispatch response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignmentRecorded {
    pub route_id:    RouteId,
    /// Stale active routes of the same unit that were switched off first.
    pub deactivated: usize,
}

/// What `Store::complete` changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionRecorded {
    pub unit:           Option<UnitId>,
    pub routes_cleared: usize,
}
