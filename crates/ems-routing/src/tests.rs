//! Unit tests for ems-routing.
//!
//! Providers are in-memory doubles; nothing here touches the network.  Test
//! geometry lives near the equator where 0.001° of latitude ≈ 111 m.

use std::sync::atomic::{AtomicUsize, Ordering};

use ems_core::{GeoPoint, JamLevel, SegmentId, UnitId};
use ems_traffic::{TrafficIndex, TrafficOverlay, TrafficSegment};

use crate::candidates::{CandidateGenerator, MAX_CANDIDATES, VIA_OFFSETS_M, VIA_POSITIONS};
use crate::nearest::{MAX_DISPATCH_DISTANCE_M, UnitCandidate, nearest_unit};
use crate::provider::{Route, RouteProvider, RouteSummary};
use crate::selector::{RouteSelector, RoutingSource};
use crate::{RoutingError, RoutingResult};

// ── Provider doubles ──────────────────────────────────────────────────────────

/// Answers summary probes with haversine distance at ~60 km/h; refuses
/// geometry calls.
struct ProbeProvider;

impl RouteProvider for ProbeProvider {
    fn name(&self) -> &'static str {
        "probe-stub"
    }
    fn summary(&self, from: GeoPoint, to: GeoPoint) -> RoutingResult<RouteSummary> {
        let distance_m = from.distance_m(to);
        Ok(RouteSummary { distance_m, duration_s: distance_m / 16.7 })
    }
    fn alternatives(&self, _: GeoPoint, _: GeoPoint) -> RoutingResult<Vec<Route>> {
        Err(RoutingError::NoRoute)
    }
    fn via(&self, _: GeoPoint, _: GeoPoint, _: GeoPoint) -> RoutingResult<Route> {
        Err(RoutingError::NoRoute)
    }
}

/// Fails every call.
struct DownProvider;

impl RouteProvider for DownProvider {
    fn name(&self) -> &'static str {
        "down-stub"
    }
    fn summary(&self, _: GeoPoint, _: GeoPoint) -> RoutingResult<RouteSummary> {
        Err(RoutingError::NoRoute)
    }
    fn alternatives(&self, _: GeoPoint, _: GeoPoint) -> RoutingResult<Vec<Route>> {
        Err(RoutingError::NoRoute)
    }
    fn via(&self, _: GeoPoint, _: GeoPoint, _: GeoPoint) -> RoutingResult<Route> {
        Err(RoutingError::NoRoute)
    }
}

/// Scripted alternatives plus one fixed answer for every via probe.
struct ScriptedProvider {
    alts: Vec<Route>,
    via_route: Option<Route>,
    via_calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(alts: Vec<Route>, via_route: Option<Route>) -> Self {
        Self { alts, via_route, via_calls: AtomicUsize::new(0) }
    }
}

impl RouteProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted-stub"
    }
    fn summary(&self, _: GeoPoint, _: GeoPoint) -> RoutingResult<RouteSummary> {
        Err(RoutingError::NoRoute)
    }
    fn alternatives(&self, _: GeoPoint, _: GeoPoint) -> RoutingResult<Vec<Route>> {
        if self.alts.is_empty() {
            Err(RoutingError::NoRoute)
        } else {
            Ok(self.alts.clone())
        }
    }
    fn via(&self, _: GeoPoint, _: GeoPoint, _: GeoPoint) -> RoutingResult<Route> {
        self.via_calls.fetch_add(1, Ordering::SeqCst);
        self.via_route.clone().ok_or(RoutingError::NoRoute)
    }
}

// ── Geometry helpers ──────────────────────────────────────────────────────────

/// Dense east-west polyline at `lat`, vertices every 0.0005° of longitude.
fn dense_east_west(lat: f64, lon0: f64, lon1: f64) -> Vec<GeoPoint> {
    let steps = ((lon1 - lon0) / 0.0005).round() as usize;
    (0..=steps)
        .map(|i| GeoPoint::new(lat, lon0 + i as f64 * 0.0005))
        .collect()
}

fn route(points: Vec<GeoPoint>, duration_s: f64) -> Route {
    let distance_m = ems_core::geo::path_length_m(&points);
    Route::from_points(points, distance_m, duration_s)
}

fn traffic(id: u32, level: JamLevel, lat: f64, lon0: f64, lon1: f64) -> TrafficSegment {
    TrafficSegment::new(
        SegmentId(id),
        None,
        level,
        vec![GeoPoint::new(lat, lon0), GeoPoint::new(lat, lon1)],
        true,
    )
    .unwrap()
}

// ── Nearest unit ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod nearest {
    use super::*;

    const INCIDENT: GeoPoint = GeoPoint { lat: 0.0, lon: 0.0 };

    fn unit(id: u32, lat_deg: f64) -> UnitCandidate {
        UnitCandidate { unit: UnitId(id), position: GeoPoint::new(lat_deg, 0.0) }
    }

    #[test]
    fn picks_minimum_distance_within_cap() {
        // ~3.3 km and ~5.6 km out.
        let pool = [unit(1, 0.03), unit(2, 0.05)];
        let best = nearest_unit(&ProbeProvider, INCIDENT, &pool).unwrap();
        assert_eq!(best.unit, UnitId(1));
        assert!(best.distance_m < 3_500.0);
        assert!(best.duration_s.is_some());
    }

    #[test]
    fn units_beyond_cap_never_selected() {
        // ~56 km and ~67 km out: both over the 50 km cap.
        let pool = [unit(1, 0.5), unit(2, 0.6)];
        let err = nearest_unit(&ProbeProvider, INCIDENT, &pool).unwrap_err();
        match err {
            RoutingError::NoEligibleUnit { nearest_m: Some(d) } => {
                assert!((d - 55_600.0).abs() < 500.0, "nearest over-cap was {d}");
                assert!(d > MAX_DISPATCH_DISTANCE_M);
            }
            other => panic!("expected NoEligibleUnit, got {other:?}"),
        }
    }

    #[test]
    fn empty_pool_reports_no_nearest() {
        let err = nearest_unit(&ProbeProvider, INCIDENT, &[]).unwrap_err();
        assert!(matches!(err, RoutingError::NoEligibleUnit { nearest_m: None }));
    }

    #[test]
    fn provider_outage_degrades_to_haversine() {
        let pool = [unit(1, 0.03), unit(2, 0.05)];
        let best = nearest_unit(&DownProvider, INCIDENT, &pool).unwrap();
        assert_eq!(best.unit, UnitId(1));
        // Haversine stands in; duration is unknowable without a provider.
        assert!(best.duration_s.is_none());
    }
}

// ── Candidate generation ──────────────────────────────────────────────────────

#[cfg(test)]
mod candidates {
    use super::*;

    const FROM: GeoPoint = GeoPoint { lat: 0.0, lon: 0.0 };
    const TO: GeoPoint = GeoPoint { lat: 0.0, lon: 0.1 };

    #[test]
    fn via_points_form_the_probe_grid() {
        let points = CandidateGenerator::via_points(FROM, TO);
        assert_eq!(points.len(), VIA_POSITIONS.len() * VIA_OFFSETS_M.len());

        // Each probe sits its offset's distance from its corridor anchor.
        for (i, &t) in VIA_POSITIONS.iter().enumerate() {
            let anchor = FROM.lerp(TO, t);
            for (j, &offset) in VIA_OFFSETS_M.iter().enumerate() {
                let p = points[i * VIA_OFFSETS_M.len() + j];
                assert!(
                    (anchor.distance_m(p) - offset).abs() < 2.0,
                    "probe ({i},{j}) sits {:.1} m out, wanted {offset}",
                    anchor.distance_m(p)
                );
            }
        }

        // Both flanks of the corridor get probed.
        assert!(points.iter().any(|p| p.lat > FROM.lat));
        assert!(points.iter().any(|p| p.lat < FROM.lat));
    }

    #[test]
    fn merges_and_dedupes_on_encoded_geometry() {
        let r1 = route(dense_east_west(0.0, 0.0, 0.1), 100.0);
        let r1_dup = r1.clone();
        let r2 = route(dense_east_west(0.01, 0.0, 0.1), 120.0);

        // Every via probe answers with a copy of r1 as well.
        let provider = ScriptedProvider::new(vec![r1.clone(), r1_dup, r2], Some(r1));
        let out = CandidateGenerator::new(&provider).generate(FROM, TO);

        assert_eq!(out.len(), 2);
        assert_eq!(provider.via_calls.load(Ordering::SeqCst), 9);
    }

    #[test]
    fn caps_total_candidates() {
        let alts: Vec<Route> = (0..30)
            .map(|i| route(dense_east_west(i as f64 * 0.001, 0.0, 0.1), 100.0 + i as f64))
            .collect();
        let provider = ScriptedProvider::new(alts, None);
        let out = CandidateGenerator::new(&provider).generate(FROM, TO);

        assert_eq!(out.len(), MAX_CANDIDATES);
        // Already at the cap before probing begins: no via calls spent.
        assert_eq!(provider.via_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn secondary_vendor_fills_in_when_primary_is_down() {
        let secondary_route = route(dense_east_west(0.0, 0.0, 0.1), 100.0);
        let secondary = ScriptedProvider::new(vec![secondary_route], None);
        let out = CandidateGenerator::new(&DownProvider)
            .with_secondary(&secondary)
            .generate(FROM, TO);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn total_outage_yields_empty_set() {
        let out = CandidateGenerator::new(&DownProvider).generate(FROM, TO);
        assert!(out.is_empty());
    }
}

// ── Route selection ───────────────────────────────────────────────────────────

#[cfg(test)]
mod selector {
    use super::*;

    fn select(
        segments: Vec<TrafficSegment>,
        candidates: Vec<Route>,
    ) -> crate::selector::SelectedRoute {
        let index = TrafficIndex::build(segments);
        RouteSelector::new(TrafficOverlay::new(&index)).select(candidates, 9_999.0, None)
    }

    #[test]
    fn clear_route_beats_blocked_shorter_one() {
        // One candidate hugs a HIGH jam (~50 m for its whole length); the
        // other stays clear but runs 10 % longer.  Rank 1 beats rank 3
        // regardless of duration.
        let hugging = route(dense_east_west(0.0, 0.0, 0.02), 100.0);
        let clear = route(dense_east_west(0.01, 0.0, 0.02), 110.0);
        let jam = traffic(1, JamLevel::High, 0.00045, 0.0, 0.02);

        let sel = select(vec![jam], vec![hugging, clear]);
        let chosen = sel.route.expect("geometry survives selection");
        assert_eq!(chosen.duration_s, 110.0);
        assert_eq!(sel.source, RoutingSource::OsrmFullGeometry);
        assert_eq!(sel.assessment.rank, 1);
        assert!(!sel.assessment.blocked);
    }

    #[test]
    fn clean_corridor_picks_fastest() {
        let fast = route(dense_east_west(0.0, 0.0, 0.02), 90.0);
        let slow = route(dense_east_west(0.01, 0.0, 0.02), 140.0);
        let sel = select(vec![], vec![slow, fast]);
        assert_eq!(sel.route.unwrap().duration_s, 90.0);
        assert_eq!(sel.duration_s, Some(90.0));
    }

    #[test]
    fn shortest_preference_overrides_marginal_congestion_win() {
        // A (the fastest) brushes 6 parts LOW + 2 parts MEDIUM → congestion
        // 0.30, rank 1.  B is clean but slower.  C stretches both
        // normalization ranges (pure MEDIUM brush → congestion 0.60, and the
        // longest duration).  Costs: A = 0.55·0.25 = 0.1375,
        // B = 0.45·(17/60) = 0.1275 — B wins by a hair, inside the 8 %
        // preference margin, so the fastest rank-1 route A is kept.
        let a = route(dense_east_west(0.0, 0.0, 0.02), 100.0);
        let b = route(dense_east_west(0.02, 0.0, 0.02), 117.0);
        let c = route(dense_east_west(0.04, 0.0, 0.02), 160.0);

        let segments = vec![
            traffic(1, JamLevel::Low, 0.0006, 0.0, 0.0025),      // 6 segments of A
            traffic(2, JamLevel::Medium, 0.0006, 0.0100, 0.0101), // 2 segments of A
            traffic(3, JamLevel::Medium, 0.0406, 0.0100, 0.0101), // 2 segments of C
        ];

        let sel = select(segments, vec![a, b, c]);
        assert_eq!(sel.route.unwrap().duration_s, 100.0);
        assert_eq!(sel.assessment.rank, 1);
    }

    #[test]
    fn all_blocked_rescues_least_bad() {
        // Both candidates hug HIGH jams; the one with the lower
        // traffic-adjusted duration is rescued.
        let worse = route(dense_east_west(0.0, 0.0, 0.02), 100.0);
        let better = route(dense_east_west(0.01, 0.0, 0.02), 90.0);
        let segments = vec![
            traffic(1, JamLevel::High, 0.00045, 0.0, 0.02),
            traffic(2, JamLevel::High, 0.01045, 0.0, 0.02),
        ];

        let sel = select(segments, vec![worse, better]);
        assert!(sel.assessment.blocked);
        assert_eq!(sel.route.unwrap().duration_s, 90.0);
        assert_eq!(sel.source, RoutingSource::OsrmFullGeometry);
    }

    #[test]
    fn no_candidates_degrades_to_geometryless_dispatch() {
        let sel = select(vec![], vec![]);
        assert!(sel.route.is_none());
        assert_eq!(sel.source, RoutingSource::EuclideanFallback);
        assert_eq!(sel.distance_m, 9_999.0);
        assert_eq!(sel.duration_s, None);
        assert_eq!(sel.assessment.rank, 1);
    }

    #[test]
    fn penalty_cap_bounds_adjusted_duration_tiebreak() {
        // Two clean-ranked candidates with identical durations and
        // congestion tie on cost; the tie-break must not overflow from an
        // uncapped penalty.  (Both brush LOW lightly, one a little more.)
        let a = route(dense_east_west(0.0, 0.0, 0.02), 100.0);
        let b = route(dense_east_west(0.02, 0.0, 0.02), 100.0);
        let segments = vec![
            traffic(1, JamLevel::Low, 0.0006, 0.0, 0.001),
            traffic(2, JamLevel::Low, 0.0206, 0.0, 0.003),
        ];
        let sel = select(segments, vec![a, b]);
        // Equal congestion (pure LOW → 0.2 each) and equal duration: the
        // smaller LOW brush wins on adjusted duration.
        assert_eq!(sel.route.unwrap().geometry, route(dense_east_west(0.0, 0.0, 0.02), 100.0).geometry);
    }
}
