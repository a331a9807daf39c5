//! Route progress computation.
//!
//! Progress for a (unit, incident) pair is a fraction in `[0, 1]` derived
//! from whichever signal is available, in priority order:
//!
//! 1. **Fresh-dispatch ramp** (first 60 s): a conservative synthetic value
//!    `0.05 + (elapsed / 300) · 0.20`, capped at 0.30.  Rendering 0 % looks
//!    stalled, and jumping straight to a GPS-derived figure before the unit
//!    has moved looks wrong.
//! 2. **GPS projection**: the live position projected onto the cached
//!    polyline, as cumulative distance along the route over total length.
//! 3. **Time fallback**: `elapsed / estimated duration`.
//!
//! Whatever the signal, the reported value never decreases while the same
//! route stays active; a new route id resets the pair to the fresh ramp.

use rustc_hash::FxHashMap;

use ems_core::{GeoPoint, IncidentId, RouteId, UnitId, geo};

/// Length of the fresh-dispatch phase, seconds.
pub const FRESH_WINDOW_S: f64 = 60.0;

/// Floor of the fresh-dispatch ramp.
pub const FRESH_BASE: f64 = 0.05;

/// The ramp adds `elapsed / 300 · 0.20` on top of the floor…
pub const FRESH_RAMP_DIVISOR: f64 = 300.0;
pub const FRESH_RAMP_GAIN: f64 = 0.20;

/// …and never exceeds this.
pub const FRESH_CAP: f64 = 0.30;

/// Per-pair monotonic progress state.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    entries: FxHashMap<(UnitId, IncidentId), Entry>,
}

#[derive(Debug)]
struct Entry {
    route: RouteId,
    best:  f64,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute and record progress for one observation.
    ///
    /// `route_points` is the cached polyline (used only in the GPS phase)
    /// and `duration_s` the route's estimated duration (used only in the
    /// time fallback).  A `route` id different from the pair's last seen one
    /// resets monotonicity — the route cache deactivated the old record, so
    /// the old floor no longer applies.
    pub fn observe(
        &mut self,
        unit: UnitId,
        incident: IncidentId,
        route: RouteId,
        elapsed_s: f64,
        route_points: &[GeoPoint],
        duration_s: Option<f64>,
        gps: Option<GeoPoint>,
    ) -> f64 {
        let raw = if elapsed_s < FRESH_WINDOW_S {
            fresh_ramp(elapsed_s)
        } else if let Some(position) = gps
            && route_points.len() >= 2
        {
            along_route_fraction(position, route_points)
        } else if let Some(duration) = duration_s
            && duration > 0.0
        {
            (elapsed_s / duration).min(1.0)
        } else {
            // No signal at all once the ramp expires: hold at the ramp cap.
            FRESH_CAP
        };

        self.commit(unit, incident, route, raw)
    }

    /// Advance a pair's progress by a fixed step (simulator ticks).
    pub fn advance(&mut self, unit: UnitId, incident: IncidentId, route: RouteId, step: f64) -> f64 {
        let current = self.peek(unit, incident).unwrap_or(0.0);
        self.commit(unit, incident, route, current + step)
    }

    /// Last reported value for a pair, if any.
    pub fn peek(&self, unit: UnitId, incident: IncidentId) -> Option<f64> {
        self.entries.get(&(unit, incident)).map(|e| e.best)
    }

    /// Drop a pair's state (incident completed).
    pub fn forget(&mut self, unit: UnitId, incident: IncidentId) {
        self.entries.remove(&(unit, incident));
    }

    fn commit(&mut self, unit: UnitId, incident: IncidentId, route: RouteId, raw: f64) -> f64 {
        let entry = self
            .entries
            .entry((unit, incident))
            .and_modify(|e| {
                if e.route != route {
                    e.route = route;
                    e.best = 0.0;
                }
            })
            .or_insert(Entry { route, best: 0.0 });

        entry.best = entry.best.max(raw.clamp(0.0, 1.0));
        entry.best
    }
}

fn fresh_ramp(elapsed_s: f64) -> f64 {
    (FRESH_BASE + elapsed_s / FRESH_RAMP_DIVISOR * FRESH_RAMP_GAIN).min(FRESH_CAP)
}

/// Fraction of the route already behind `position`: cumulative length up to
/// the nearest segment plus the along-segment distance, over total length.
fn along_route_fraction(position: GeoPoint, points: &[GeoPoint]) -> f64 {
    let total = geo::path_length_m(points);
    if total <= 0.0 {
        return 0.0;
    }

    let mut cumulative = 0.0;
    let mut best_distance = f64::MAX;
    let mut best_along = 0.0;

    for pair in points.windows(2) {
        let proj = geo::point_to_segment(position, pair[0], pair[1]);
        if proj.distance_m < best_distance {
            best_distance = proj.distance_m;
            best_along = cumulative + proj.along_m;
        }
        cumulative += pair[0].distance_m(pair[1]);
    }

    (best_along / total).clamp(0.0, 1.0)
}
