//! Traffic-aware route selection.
//!
//! Selection runs a strict ladder:
//!
//! 1. Drop hard-blocked candidates (per the traffic overlay).
//! 2. Among survivors, keep only the best severity-rank class.
//! 3. Within that class, rank by a normalized cost mixing congestion and
//!    duration, then apply the shortest-route preference rule.
//! 4. No survivors → **rescue pass**: the least-bad candidate overall by
//!    `(rank, traffic-adjusted duration)`, block or no block.
//! 5. No candidates at all → **geometry-less fallback** on the
//!    distance/duration the nearest-unit pass already measured.  Dispatch
//!    always proceeds; only visualization degrades.

use log::{info, warn};

use ems_traffic::{TrafficAssessment, TrafficOverlay};

use crate::provider::Route;

// ── Tuning constants ──────────────────────────────────────────────────────────

/// Weight of the normalized congestion score in the combined cost.
pub const CONGESTION_WEIGHT: f64 = 0.55;

/// Weight of the normalized duration in the combined cost.
pub const DURATION_WEIGHT: f64 = 0.45;

/// The shortest-duration rank-1 candidate wins outright if its cost is
/// within this fraction of the cost-optimal candidate.
pub const SHORTEST_PREFERENCE_MARGIN: f64 = 0.08;

/// Traffic penalty is capped at this fraction of base duration so one long
/// jam overlap cannot produce a runaway adjusted duration.
pub const PENALTY_CAP_FRACTION: f64 = 0.35;

// ── Output types ──────────────────────────────────────────────────────────────

/// Provenance of a dispatch route, persisted with the route record and
/// echoed to clients.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingSource {
    /// Full provider geometry survived selection.
    OsrmFullGeometry,
    /// Every provider path failed; distance is a straight-line or probe
    /// figure and there is no geometry to render.
    EuclideanFallback,
}

impl RoutingSource {
    pub fn as_str(self) -> &'static str {
        match self {
            RoutingSource::OsrmFullGeometry => "osrm_full_geometry",
            RoutingSource::EuclideanFallback => "euclidean_fallback",
        }
    }
}

/// The selector's verdict for one dispatch.
#[derive(Debug, Clone)]
pub struct SelectedRoute {
    /// `None` only for the geometry-less fallback.
    pub route: Option<Route>,
    pub distance_m: f64,
    /// Unknown when the fallback distance came from haversine.
    pub duration_s: Option<f64>,
    /// Assessment of the chosen route (clean for the fallback).
    pub assessment: TrafficAssessment,
    pub source: RoutingSource,
}

// ── RouteSelector ─────────────────────────────────────────────────────────────

/// Scores candidates against a traffic overlay and picks one.
pub struct RouteSelector<'a> {
    overlay: TrafficOverlay<'a>,
}

struct Scored {
    route: Route,
    assessment: TrafficAssessment,
}

impl Scored {
    /// Duration plus capped penalty — the tie-break metric.
    fn adjusted_duration(&self) -> f64 {
        let cap = self.route.duration_s * PENALTY_CAP_FRACTION;
        self.route.duration_s + self.assessment.penalty_s.min(cap)
    }
}

impl<'a> RouteSelector<'a> {
    pub fn new(overlay: TrafficOverlay<'a>) -> Self {
        Self { overlay }
    }

    /// Pick a route from `candidates`, falling back to
    /// `(fallback_distance_m, fallback_duration_s)` — the figures measured
    /// during unit selection — when no candidate survives.
    pub fn select(
        &self,
        candidates: Vec<Route>,
        fallback_distance_m: f64,
        fallback_duration_s: Option<f64>,
    ) -> SelectedRoute {
        let scored: Vec<Scored> = candidates
            .into_iter()
            .map(|route| {
                let assessment = self.overlay.assess(&route.points);
                Scored { route, assessment }
            })
            .collect();

        if scored.is_empty() {
            warn!("route selection: no candidates at all, dispatching without geometry");
            return fallback(fallback_distance_m, fallback_duration_s);
        }

        let survivors: Vec<&Scored> = scored.iter().filter(|s| !s.assessment.blocked).collect();

        if survivors.is_empty() {
            return match rescue(&scored) {
                Some(sel) => sel,
                None => fallback(fallback_distance_m, fallback_duration_s),
            };
        }

        pick_among(&survivors)
    }
}

// ── Selection internals ───────────────────────────────────────────────────────

/// Normal path: best-rank subset, normalized cost, shortest-preference rule.
fn pick_among(survivors: &[&Scored]) -> SelectedRoute {
    let min_rank = survivors.iter().map(|s| s.assessment.rank).min().unwrap_or(1);
    let class: Vec<&Scored> =
        survivors.iter().copied().filter(|s| s.assessment.rank == min_rank).collect();

    // Normalize duration and congestion to [0, 1] within the class.
    let (d_min, d_max) = min_max(class.iter().map(|s| s.route.duration_s));
    let (c_min, c_max) = min_max(class.iter().map(|s| s.assessment.congestion));

    let cost = |s: &Scored| -> f64 {
        CONGESTION_WEIGHT * normalize(s.assessment.congestion, c_min, c_max)
            + DURATION_WEIGHT * normalize(s.route.duration_s, d_min, d_max)
    };

    let mut best = class[0];
    for s in class.iter().skip(1) {
        let (a, b) = (cost(s), cost(best));
        if a < b || (a == b && s.adjusted_duration() < best.adjusted_duration()) {
            best = s;
        }
    }

    // Shortest-route preference: when congestion is effectively absent, a
    // marginal cost win should not displace the plainly fastest route.
    if min_rank == 1 {
        let shortest = class
            .iter()
            .copied()
            .min_by(|a, b| a.route.duration_s.total_cmp(&b.route.duration_s))
            .unwrap_or(best);
        if !std::ptr::eq(shortest, best)
            && cost(shortest) <= cost(best) * (1.0 + SHORTEST_PREFERENCE_MARGIN)
        {
            best = shortest;
        }
    }

    SelectedRoute {
        distance_m: best.route.distance_m,
        duration_s: Some(best.route.duration_s),
        assessment: best.assessment.clone(),
        source: RoutingSource::OsrmFullGeometry,
        route: Some(best.route.clone()),
    }
}

/// Rescue pass: every candidate is blocked, so take the least-bad one by
/// `(rank, traffic-adjusted duration)`.  Emergency response is never held
/// up by the overlay.
fn rescue(scored: &[Scored]) -> Option<SelectedRoute> {
    let best = scored.iter().min_by(|a, b| {
        (a.assessment.rank, a.adjusted_duration())
            .partial_cmp(&(b.assessment.rank, b.adjusted_duration()))
            .unwrap_or(std::cmp::Ordering::Equal)
    })?;

    info!(
        "route selection: all {} candidates blocked, rescuing rank-{} route",
        scored.len(),
        best.assessment.rank
    );

    Some(SelectedRoute {
        distance_m: best.route.distance_m,
        duration_s: Some(best.route.duration_s),
        assessment: best.assessment.clone(),
        source: RoutingSource::OsrmFullGeometry,
        route: Some(best.route.clone()),
    })
}

/// Geometry-less fallback: dispatch proceeds, live-route rendering degrades.
fn fallback(distance_m: f64, duration_s: Option<f64>) -> SelectedRoute {
    SelectedRoute {
        route: None,
        distance_m,
        duration_s,
        assessment: TrafficAssessment::clean(),
        source: RoutingSource::EuclideanFallback,
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::MAX, f64::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

fn normalize(v: f64, lo: f64, hi: f64) -> f64 {
    if hi > lo { (v - lo) / (hi - lo) } else { 0.0 }
}
