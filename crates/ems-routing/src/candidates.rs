//! Route candidate generation.
//!
//! Three sources feed one de-duplicated candidate list:
//!
//! 1. The primary provider's native alternatives.
//! 2. Synthetic **via-point probes**: the direct corridor is sampled at
//!    three along-route positions, each offset perpendicular to the
//!    source→destination bearing at three increasing magnitudes, and each
//!    resulting point is forced as a mandatory waypoint in its own provider
//!    call.  A probe that lands on a different arterial surfaces a route the
//!    provider's own alternatives never return.
//! 3. An optional secondary vendor's alternatives.
//!
//! Duplicates collapse on exact encoded geometry.  Any individual provider
//! failure is logged and skipped; generation itself never fails — an empty
//! result is the selector's problem (it has a fallback ladder for it).

use log::{debug, warn};
use rustc_hash::FxHashSet;

use ems_core::GeoPoint;

use crate::provider::{Route, RouteProvider};

/// Upper bound on candidates fed to the selector.  Each candidate costs a
/// full overlay assessment; the probe grid can't exceed this by much, but a
/// chatty secondary vendor could.
pub const MAX_CANDIDATES: usize = 24;

/// Along-route positions of the probe anchors (fractions of the corridor).
pub const VIA_POSITIONS: [f64; 3] = [0.35, 0.5, 0.65];

/// Perpendicular offset magnitudes for the probe anchors, in metres.
pub const VIA_OFFSETS_M: [f64; 3] = [400.0, 800.0, 1200.0];

/// Generates candidate routes between two points.
pub struct CandidateGenerator<'a> {
    primary: &'a dyn RouteProvider,
    secondary: Option<&'a dyn RouteProvider>,
}

impl<'a> CandidateGenerator<'a> {
    pub fn new(primary: &'a dyn RouteProvider) -> Self {
        Self { primary, secondary: None }
    }

    pub fn with_secondary(mut self, secondary: &'a dyn RouteProvider) -> Self {
        self.secondary = Some(secondary);
        self
    }

    /// The deterministic probe points for a corridor, in generation order.
    pub fn via_points(from: GeoPoint, to: GeoPoint) -> Vec<GeoPoint> {
        let bearing = from.bearing_to(to);
        let mut points = Vec::with_capacity(VIA_POSITIONS.len() * VIA_OFFSETS_M.len());

        for (i, &t) in VIA_POSITIONS.iter().enumerate() {
            let anchor = from.lerp(to, t);
            for (j, &offset) in VIA_OFFSETS_M.iter().enumerate() {
                // Alternate sides of the corridor by grid parity so both
                // flanks are probed without doubling the call count.
                let side = if (i + j) % 2 == 0 {
                    std::f64::consts::FRAC_PI_2
                } else {
                    -std::f64::consts::FRAC_PI_2
                };
                points.push(anchor.offset_m(bearing + side, offset));
            }
        }
        points
    }

    /// Generate up to [`MAX_CANDIDATES`] distinct candidates.
    ///
    /// Never fails; provider errors shrink the candidate set instead.
    pub fn generate(&self, from: GeoPoint, to: GeoPoint) -> Vec<Route> {
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut candidates: Vec<Route> = Vec::new();

        let push = |route: Route, candidates: &mut Vec<Route>, seen: &mut FxHashSet<String>| {
            if candidates.len() < MAX_CANDIDATES && seen.insert(route.geometry.clone()) {
                candidates.push(route);
            }
        };

        // ── Primary alternatives ──────────────────────────────────────────
        match self.primary.alternatives(from, to) {
            Ok(routes) => {
                for r in routes {
                    push(r, &mut candidates, &mut seen);
                }
            }
            Err(e) => warn!("{}: alternatives failed: {e}", self.primary.name()),
        }

        // ── Via-point probes ──────────────────────────────────────────────
        for via in Self::via_points(from, to) {
            if candidates.len() >= MAX_CANDIDATES {
                break;
            }
            match self.primary.via(from, via, to) {
                Ok(r) => push(r, &mut candidates, &mut seen),
                // Probes regularly land in rivers and parks; skipping is
                // the expected outcome, not an incident.
                Err(e) => debug!("{}: via probe failed: {e}", self.primary.name()),
            }
        }

        // ── Secondary vendor ──────────────────────────────────────────────
        if let Some(secondary) = self.secondary {
            match secondary.alternatives(from, to) {
                Ok(routes) => {
                    for r in routes {
                        push(r, &mut candidates, &mut seen);
                    }
                }
                Err(e) => warn!("{}: alternatives failed: {e}", secondary.name()),
            }
        }

        debug!("candidate generation: {} distinct routes", candidates.len());
        candidates
    }
}
