//! The provider seam: strongly typed routes and the `RouteProvider` trait.
//!
//! Provider responses are decoded into [`Route`] exactly once, at the HTTP
//! boundary.  Everything downstream (overlay, selector, cache, tracker)
//! operates on these types and never on raw JSON or encoded strings.

use ems_core::{GeoPoint, polyline};

use crate::RoutingResult;

// ── Route ─────────────────────────────────────────────────────────────────────

/// One candidate path between two points, before traffic-aware selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Decoded geometry, source to destination.
    pub points: Vec<GeoPoint>,
    /// The encoded-polyline form of `points`.  Kept alongside because it is
    /// both the de-duplication key and the persisted representation.
    pub geometry: String,
    /// Driving distance in metres.
    pub distance_m: f64,
    /// Driving duration in seconds.
    pub duration_s: f64,
}

impl Route {
    /// Build from decoded points, encoding the geometry string.
    pub fn from_points(points: Vec<GeoPoint>, distance_m: f64, duration_s: f64) -> Route {
        let geometry = polyline::encode(&points);
        Route { points, geometry, distance_m, duration_s }
    }
}

/// Distance/duration pair without geometry — the cheap probe shape used for
/// nearest-unit scans (`overview=false` upstream).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteSummary {
    pub distance_m: f64,
    pub duration_s: f64,
}

// ── RouteProvider ─────────────────────────────────────────────────────────────

/// A routing vendor, normalized.
///
/// Implementations must be `Send + Sync`: the dispatcher is called from
/// request threads while the movement simulator owns a worker thread, and
/// both may hold the same provider handle.
///
/// Every method is expected to enforce its own request timeout (3–5 s);
/// callers treat any `Err` as "skip this probe and fall back", never as a
/// user-facing failure.
pub trait RouteProvider: Send + Sync {
    /// Short vendor tag for log lines.
    fn name(&self) -> &'static str;

    /// Distance/duration only, no geometry.
    fn summary(&self, from: GeoPoint, to: GeoPoint) -> RoutingResult<RouteSummary>;

    /// Full-geometry alternatives (the vendor decides how many, often 1–3).
    fn alternatives(&self, from: GeoPoint, to: GeoPoint) -> RoutingResult<Vec<Route>>;

    /// Full-geometry route forced through `via` as a mandatory waypoint.
    fn via(&self, from: GeoPoint, via: GeoPoint, to: GeoPoint) -> RoutingResult<Route>;
}
