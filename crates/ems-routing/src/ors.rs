//! openrouteservice client — optional secondary provider.
//!
//! A different vendor surfaces alternatives OSRM's own `alternatives=true`
//! misses (different base data, different penalties).  The GeoJSON response
//! is normalized into the same [`Route`] shape at this boundary; downstream
//! code cannot tell the vendors apart, which is the point.
//!
//! openrouteservice has no distance-only endpoint worth a separate shape, so
//! [`RouteProvider::summary`] runs the full call and drops the geometry.
//! This provider is only ever used for supplemental candidates, so that
//! path is cold.

use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use serde::Deserialize;

use ems_core::GeoPoint;

use crate::provider::{Route, RouteProvider, RouteSummary};
use crate::{RoutingError, RoutingResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for the openrouteservice `v2/directions/driving-car` endpoint.
pub struct OrsProvider {
    base_url: String,
    api_key: String,
    client: Client,
}

impl OrsProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> RoutingResult<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { base_url: base_url.into(), api_key: api_key.into(), client })
    }

    fn route(&self, points: &[GeoPoint]) -> RoutingResult<Route> {
        let url = format!("{}/v2/directions/driving-car", self.base_url);
        debug!("ors: GET {url}");

        let mut query: Vec<(&str, String)> = vec![
            ("api_key", self.api_key.clone()),
            ("start", format!("{:.6},{:.6}", points[0].lon, points[0].lat)),
            (
                "end",
                format!(
                    "{:.6},{:.6}",
                    points[points.len() - 1].lon,
                    points[points.len() - 1].lat
                ),
            ),
        ];
        if points.len() == 3 {
            query.push(("via", format!("{:.6},{:.6}", points[1].lon, points[1].lat)));
        }

        let body: OrsResponse = self
            .client
            .get(&url)
            .query(&query)
            .timeout(REQUEST_TIMEOUT)
            .send()?
            .error_for_status()?
            .json()?;

        let feature = body.features.into_iter().next().ok_or(RoutingError::NoRoute)?;
        let points: Vec<GeoPoint> = feature
            .geometry
            .coordinates
            .into_iter()
            .map(|c| GeoPoint::new(c[1], c[0])) // GeoJSON is lon-first
            .collect();
        if points.len() < 2 {
            return Err(RoutingError::Malformed("degenerate geometry".into()));
        }

        Ok(Route::from_points(
            points,
            feature.properties.summary.distance,
            feature.properties.summary.duration,
        ))
    }
}

impl RouteProvider for OrsProvider {
    fn name(&self) -> &'static str {
        "ors"
    }

    fn summary(&self, from: GeoPoint, to: GeoPoint) -> RoutingResult<RouteSummary> {
        let r = self.route(&[from, to])?;
        Ok(RouteSummary { distance_m: r.distance_m, duration_s: r.duration_s })
    }

    fn alternatives(&self, from: GeoPoint, to: GeoPoint) -> RoutingResult<Vec<Route>> {
        // One route per call; the generator merges it with the primary set.
        Ok(vec![self.route(&[from, to])?])
    }

    fn via(&self, from: GeoPoint, via: GeoPoint, to: GeoPoint) -> RoutingResult<Route> {
        self.route(&[from, via, to])
    }
}

// ── Wire types (GeoJSON subset) ───────────────────────────────────────────────

#[derive(Deserialize)]
struct OrsResponse {
    #[serde(default)]
    features: Vec<OrsFeature>,
}

#[derive(Deserialize)]
struct OrsFeature {
    geometry: OrsGeometry,
    properties: OrsProperties,
}

#[derive(Deserialize)]
struct OrsGeometry {
    coordinates: Vec<[f64; 2]>,
}

#[derive(Deserialize)]
struct OrsProperties {
    summary: OrsSummary,
}

#[derive(Deserialize)]
struct OrsSummary {
    distance: f64,
    duration: f64,
}
