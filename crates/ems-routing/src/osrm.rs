//! OSRM HTTP client — the primary routing provider.
//!
//! Consumes `GET {base}/route/v1/driving/{lon},{lat};{lon},{lat}` with
//! `geometries=polyline` (precision 1e-5, matching the core codec).
//! Coordinates go on the wire longitude-first; everything in this codebase
//! is latitude-first, so the flip happens in exactly one place
//! ([`coord_path`]).

use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use serde::Deserialize;

use ems_core::{GeoPoint, polyline};

use crate::provider::{Route, RouteProvider, RouteSummary};
use crate::{RoutingError, RoutingResult};

/// Timeout for distance-only probes (nearest-unit scan: one call per pooled
/// unit, so this is the latency-critical one).
const SUMMARY_TIMEOUT: Duration = Duration::from_secs(3);

/// Timeout for full-geometry calls.
const GEOMETRY_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for an OSRM `route` service.
pub struct OsrmProvider {
    base_url: String,
    client: Client,
}

impl OsrmProvider {
    /// `base_url` without a trailing slash, e.g.
    /// `https://router.project-osrm.org`.
    pub fn new(base_url: impl Into<String>) -> RoutingResult<Self> {
        let client = Client::builder()
            .timeout(GEOMETRY_TIMEOUT)
            .build()?;
        Ok(Self { base_url: base_url.into(), client })
    }

    fn request(
        &self,
        coords: &str,
        overview: &str,
        alternatives: bool,
        timeout: Duration,
    ) -> RoutingResult<OsrmResponse> {
        let url = format!("{}/route/v1/driving/{coords}", self.base_url);
        debug!("osrm: GET {url} overview={overview} alternatives={alternatives}");

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("overview", overview),
                ("geometries", "polyline"),
                ("steps", "false"),
                ("alternatives", if alternatives { "true" } else { "false" }),
            ])
            .timeout(timeout)
            .send()?
            .error_for_status()?;

        Ok(resp.json::<OsrmResponse>()?)
    }
}

impl RouteProvider for OsrmProvider {
    fn name(&self) -> &'static str {
        "osrm"
    }

    fn summary(&self, from: GeoPoint, to: GeoPoint) -> RoutingResult<RouteSummary> {
        let body = self.request(&coord_path(&[from, to]), "false", false, SUMMARY_TIMEOUT)?;
        let route = body.routes.into_iter().next().ok_or(RoutingError::NoRoute)?;
        Ok(RouteSummary { distance_m: route.distance, duration_s: route.duration })
    }

    fn alternatives(&self, from: GeoPoint, to: GeoPoint) -> RoutingResult<Vec<Route>> {
        let body = self.request(&coord_path(&[from, to]), "full", true, GEOMETRY_TIMEOUT)?;
        if body.routes.is_empty() {
            return Err(RoutingError::NoRoute);
        }
        body.routes.into_iter().map(decode_route).collect()
    }

    fn via(&self, from: GeoPoint, via: GeoPoint, to: GeoPoint) -> RoutingResult<Route> {
        let body =
            self.request(&coord_path(&[from, via, to]), "full", false, GEOMETRY_TIMEOUT)?;
        let route = body.routes.into_iter().next().ok_or(RoutingError::NoRoute)?;
        decode_route(route)
    }
}

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct OsrmResponse {
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize)]
struct OsrmRoute {
    geometry: Option<String>,
    distance: f64,
    duration: f64,
}

fn decode_route(r: OsrmRoute) -> RoutingResult<Route> {
    let geometry = r
        .geometry
        .ok_or_else(|| RoutingError::Malformed("route without geometry".into()))?;
    let points = polyline::decode(&geometry)?;
    Ok(Route { points, geometry, distance_m: r.distance, duration_s: r.duration })
}

/// `lon,lat;lon,lat;…` path segment, the one lon-first spot in the system.
fn coord_path(points: &[GeoPoint]) -> String {
    points
        .iter()
        .map(|p| format!("{:.6},{:.6}", p.lon, p.lat))
        .collect::<Vec<_>>()
        .join(";")
}
