//! Nearest eligible unit selection.
//!
//! The caller supplies the pool — units already filtered to the required
//! capability and `AVAILABLE` status — and gets back the one with minimum
//! driving distance within the hard cap.  Each unit costs one distance-only
//! provider probe; a probe failure silently degrades that unit to haversine
//! distance rather than excluding it (a routing outage must not strand an
//! incident).

use log::{debug, warn};

use ems_core::{GeoPoint, UnitId};

use crate::provider::RouteProvider;
use crate::{RoutingError, RoutingResult};

/// Units farther than this (by road or haversine) are never dispatched.
pub const MAX_DISPATCH_DISTANCE_M: f64 = 50_000.0;

/// One unit in the eligibility pool.
#[derive(Debug, Clone, Copy)]
pub struct UnitCandidate {
    pub unit: UnitId,
    pub position: GeoPoint,
}

/// Winner of the nearest-unit scan.
#[derive(Debug, Clone, Copy)]
pub struct NearestUnit {
    pub unit: UnitId,
    pub position: GeoPoint,
    pub distance_m: f64,
    /// `None` when the provider probe failed and haversine stood in.
    pub duration_s: Option<f64>,
}

/// Pick the minimum-distance unit from `pool` for an incident at `incident`.
///
/// # Errors
///
/// [`RoutingError::NoEligibleUnit`] when the pool is empty or every unit is
/// beyond [`MAX_DISPATCH_DISTANCE_M`]; carries the nearest over-cap distance
/// seen so operators can tell "nothing staffed" from "everything too far".
pub fn nearest_unit(
    provider: &dyn RouteProvider,
    incident: GeoPoint,
    pool: &[UnitCandidate],
) -> RoutingResult<NearestUnit> {
    let mut best: Option<NearestUnit> = None;
    let mut nearest_raw: Option<f64> = None;

    for candidate in pool {
        let (distance_m, duration_s) = match provider.summary(candidate.position, incident) {
            Ok(s) => (s.distance_m, Some(s.duration_s)),
            Err(e) => {
                warn!(
                    "{}: summary probe failed for {}: {e}; falling back to haversine",
                    provider.name(),
                    candidate.unit
                );
                (candidate.position.distance_m(incident), None)
            }
        };

        // Track the closest distance even over the cap, for the error report.
        if nearest_raw.is_none_or(|d| distance_m < d) {
            nearest_raw = Some(distance_m);
        }

        if distance_m > MAX_DISPATCH_DISTANCE_M {
            debug!("{} at {distance_m:.0} m exceeds dispatch cap, skipped", candidate.unit);
            continue;
        }

        if best.as_ref().is_none_or(|b| distance_m < b.distance_m) {
            best = Some(NearestUnit {
                unit: candidate.unit,
                position: candidate.position,
                distance_m,
                duration_s,
            });
        }
    }

    best.ok_or(RoutingError::NoEligibleUnit { nearest_m: nearest_raw })
}
