//! Broadcast events and the transport seam.
//!
//! The core publishes state changes through the [`Broadcaster`] trait and
//! never knows the transport (websocket hub, message bus, test vector).
//! Delivery is best-effort, at-most-once: a missed location update is
//! superseded by the next tick, so `publish` returns nothing.

use ems_core::{IncidentId, LegStatus, UnitId, UnitStatus};

/// A state change worth telling subscribers about.
///
/// Serialized field names are the wire contract shared with dashboard
/// clients; they do not follow the internal naming.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackingEvent {
    /// A unit moved (live GPS or simulated).
    UnitLocation {
        unit_id:      UnitId,
        latitude:     f64,
        longitude:    f64,
        /// Leg label derived from progress (DEPARTED/ENROUTE/…).
        status:       LegStatus,
        progress:     f64,
        emergency_id: Option<IncidentId>,
        timestamp:    i64,
    },
    /// A unit changed lifecycle status (dispatched, released).
    UnitStatus {
        unit_id:      UnitId,
        status:       UnitStatus,
        emergency_id: Option<IncidentId>,
        timestamp:    i64,
    },
    /// An incident got its unit.
    IncidentAssigned {
        emergency_id: IncidentId,
        unit_id:      UnitId,
        distance_m:   f64,
        timestamp:    i64,
    },
    /// An incident was closed and its unit released.
    IncidentCompleted {
        emergency_id:   IncidentId,
        unit_id:        Option<UnitId>,
        routes_cleared: usize,
        timestamp:      i64,
    },
}

/// Fan-out seam.  Implementations must be cheap and non-blocking from the
/// caller's perspective; anything slow belongs behind the implementation's
/// own queue.
pub trait Broadcaster: Send + Sync {
    fn publish(&self, event: &TrackingEvent);
}

/// Discards everything.  Useful for tools that only want the store effects.
pub struct NullBroadcaster;

impl Broadcaster for NullBroadcaster {
    fn publish(&self, _event: &TrackingEvent) {}
}
