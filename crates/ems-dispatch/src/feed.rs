//! Bridges the store to the movement simulator.

use std::sync::Arc;

use ems_store::{Store, StoreError};
use ems_tracking::{AssignmentFeed, SimAssignment, TrackingError, TrackingResult};

/// Reads the simulator's work list from the dispatch store: every
/// `ASSIGNED` incident joined with its unit's active route.
pub struct StoreAssignmentFeed {
    store: Arc<Store>,
}

impl StoreAssignmentFeed {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

impl AssignmentFeed for StoreAssignmentFeed {
    fn active_assignments(&self) -> TrackingResult<Vec<SimAssignment>> {
        let incidents = self.store.assigned_incidents().map_err(feed_err)?;
        let mut out = Vec::with_capacity(incidents.len());

        for incident in incidents {
            let Some(unit) = incident.assigned_unit else {
                continue;
            };
            // A missing route only means a geometry-less record was purged;
            // the incident simply doesn't animate.
            let Some(route) = self.store.active_route(unit, incident.id).map_err(feed_err)? else {
                continue;
            };
            out.push(SimAssignment {
                unit,
                incident:      incident.id,
                route:         route.id,
                start:         route.start,
                end:           route.end,
                duration_s:    route.duration_s,
                dispatched_at: route.created_at,
            });
        }
        Ok(out)
    }
}

fn feed_err(e: StoreError) -> TrackingError {
    TrackingError::Feed(Box::new(e))
}
