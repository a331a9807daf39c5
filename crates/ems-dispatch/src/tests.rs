//! End-to-end dispatch tests with in-memory doubles: no network, no disk.

use std::sync::{Arc, Mutex};

use ems_core::{
    GeoPoint, IncidentId, IncidentStatus, JamLevel, SegmentId, ServiceKind, UnitId, UnitStatus,
};
use ems_routing::{
    Route, RouteProvider, RouteSummary, RoutingError, RoutingResult, RoutingSource,
};
use ems_store::{IncidentRecord, Store, UnitRecord};
use ems_tracking::{AssignmentFeed, Broadcaster, TrackingEvent};
use ems_traffic::{TrafficIndex, TrafficSegment};

use crate::dispatcher::{Dispatcher, GpsReport};
use crate::error::DispatchError;
use crate::feed::StoreAssignmentFeed;

// ── Doubles ───────────────────────────────────────────────────────────────────

/// Summaries from haversine at ~54 km/h; one straight-line route geometry.
struct StraightLineProvider;

fn straight_route(from: GeoPoint, to: GeoPoint) -> Route {
    let points: Vec<GeoPoint> = (0..=20).map(|i| from.lerp(to, i as f64 / 20.0)).collect();
    let distance_m = ems_core::geo::path_length_m(&points);
    Route::from_points(points, distance_m, distance_m / 15.0)
}

impl RouteProvider for StraightLineProvider {
    fn name(&self) -> &'static str {
        "straight-stub"
    }
    fn summary(&self, from: GeoPoint, to: GeoPoint) -> RoutingResult<RouteSummary> {
        let distance_m = from.distance_m(to);
        Ok(RouteSummary { distance_m, duration_s: distance_m / 15.0 })
    }
    fn alternatives(&self, from: GeoPoint, to: GeoPoint) -> RoutingResult<Vec<Route>> {
        Ok(vec![straight_route(from, to)])
    }
    fn via(&self, _: GeoPoint, _: GeoPoint, _: GeoPoint) -> RoutingResult<Route> {
        Err(RoutingError::NoRoute)
    }
}

/// Two fixed alternatives regardless of endpoints, plus haversine summaries.
struct TwoRouteProvider {
    first:  Route,
    second: Route,
}

impl RouteProvider for TwoRouteProvider {
    fn name(&self) -> &'static str {
        "two-route-stub"
    }
    fn summary(&self, from: GeoPoint, to: GeoPoint) -> RoutingResult<RouteSummary> {
        let distance_m = from.distance_m(to);
        Ok(RouteSummary { distance_m, duration_s: distance_m / 15.0 })
    }
    fn alternatives(&self, _: GeoPoint, _: GeoPoint) -> RoutingResult<Vec<Route>> {
        Ok(vec![self.first.clone(), self.second.clone()])
    }
    fn via(&self, _: GeoPoint, _: GeoPoint, _: GeoPoint) -> RoutingResult<Route> {
        Err(RoutingError::NoRoute)
    }
}

#[derive(Default)]
struct CollectingBroadcaster {
    events: Mutex<Vec<TrackingEvent>>,
}

impl Broadcaster for CollectingBroadcaster {
    fn publish(&self, event: &TrackingEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ── Fixtures ──────────────────────────────────────────────────────────────────

const INCIDENT_AT: GeoPoint = GeoPoint { lat: 0.0, lon: 0.0 };

fn seed_unit(store: &Store, id: u32, lat: f64) {
    store
        .insert_unit(&UnitRecord {
            id:        UnitId(id),
            call_sign: format!("MEDIC-{id}"),
            kind:      ServiceKind::Ambulance,
            status:    UnitStatus::Available,
            position:  GeoPoint::new(lat, 0.0),
        })
        .unwrap();
}

fn seed_incident(store: &Store, id: u32) {
    store
        .insert_incident(&IncidentRecord {
            id:            IncidentId(id),
            kind:          ServiceKind::Ambulance,
            status:        IncidentStatus::Pending,
            location:      INCIDENT_AT,
            assigned_unit: None,
            created_at:    1_700_000_000,
        })
        .unwrap();
}

fn dispatcher(
    provider: Arc<dyn RouteProvider>,
    traffic: TrafficIndex,
) -> (Dispatcher, Arc<Store>, Arc<CollectingBroadcaster>) {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let broadcaster = Arc::new(CollectingBroadcaster::default());
    let registry = Arc::new(ems_tracking::LiveLocationRegistry::new());
    let d = Dispatcher::new(
        Arc::clone(&store),
        provider,
        traffic,
        registry,
        Arc::clone(&broadcaster) as Arc<dyn Broadcaster>,
    );
    (d, store, broadcaster)
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[test]
fn nearest_available_unit_wins_with_full_geometry() {
    let (d, store, broadcaster) =
        dispatcher(Arc::new(StraightLineProvider), TrafficIndex::empty());
    seed_unit(&store, 1, 0.027); // ~3 km
    seed_unit(&store, 2, 0.045); // ~5 km
    seed_incident(&store, 10);

    let outcome = d.dispatch(IncidentId(10)).unwrap();
    assert_eq!(outcome.assigned_unit_id, UnitId(1));
    assert_eq!(outcome.routing_source, RoutingSource::OsrmFullGeometry);
    assert!(outcome.waypoint_count > 0);
    assert_eq!(outcome.route_positions.len(), outcome.waypoint_count);
    assert!((outcome.distance_m - 3_000.0).abs() < 100.0);

    assert_eq!(store.unit(UnitId(1)).unwrap().status, UnitStatus::Dispatched);
    assert_eq!(store.unit(UnitId(2)).unwrap().status, UnitStatus::Available);
    let route = store.active_route(UnitId(1), IncidentId(10)).unwrap().unwrap();
    assert_eq!(route.routing_source, "osrm_full_geometry");

    let events = broadcaster.events.lock().unwrap();
    assert!(matches!(
        events[0],
        TrackingEvent::IncidentAssigned { unit_id: UnitId(1), emergency_id: IncidentId(10), .. }
    ));
    assert!(matches!(
        events[1],
        TrackingEvent::UnitStatus {
            unit_id: UnitId(1),
            status: UnitStatus::Dispatched,
            emergency_id: Some(IncidentId(10)),
            ..
        }
    ));
}

#[test]
fn long_provider_geometry_is_reencoded_after_capping() {
    // A provider route far denser than the waypoint cap: the persisted
    // polyline must decode to the capped list, not the raw 601 points.
    struct DenseRouteProvider;

    impl RouteProvider for DenseRouteProvider {
        fn name(&self) -> &'static str {
            "dense-stub"
        }
        fn summary(&self, from: GeoPoint, to: GeoPoint) -> RoutingResult<RouteSummary> {
            let distance_m = from.distance_m(to);
            Ok(RouteSummary { distance_m, duration_s: distance_m / 15.0 })
        }
        fn alternatives(&self, from: GeoPoint, to: GeoPoint) -> RoutingResult<Vec<Route>> {
            let points: Vec<GeoPoint> =
                (0..=600).map(|i| from.lerp(to, i as f64 / 600.0)).collect();
            let distance_m = ems_core::geo::path_length_m(&points);
            Ok(vec![Route::from_points(points, distance_m, distance_m / 15.0)])
        }
        fn via(&self, _: GeoPoint, _: GeoPoint, _: GeoPoint) -> RoutingResult<Route> {
            Err(RoutingError::NoRoute)
        }
    }

    let (d, store, _) = dispatcher(Arc::new(DenseRouteProvider), TrafficIndex::empty());
    seed_unit(&store, 1, 0.027);
    seed_incident(&store, 10);

    let outcome = d.dispatch(IncidentId(10)).unwrap();
    assert_eq!(outcome.waypoint_count, ems_core::MAX_WAYPOINTS);

    let route = store.active_route(UnitId(1), IncidentId(10)).unwrap().unwrap();
    let decoded = ems_core::polyline::decode(route.geometry.as_deref().unwrap()).unwrap();
    assert_eq!(decoded.len(), route.waypoints.len());
    assert_eq!(decoded.len(), outcome.waypoint_count);
}

#[test]
fn far_away_pool_rejects_without_mutating_state() {
    let (d, store, broadcaster) =
        dispatcher(Arc::new(StraightLineProvider), TrafficIndex::empty());
    seed_unit(&store, 1, 0.54); // ~60 km
    seed_incident(&store, 10);

    let err = d.dispatch(IncidentId(10)).unwrap_err();
    match err {
        DispatchError::Routing(RoutingError::NoEligibleUnit { nearest_m: Some(m) }) => {
            assert!((m - 60_000.0).abs() < 500.0, "nearest_m was {m}");
        }
        other => panic!("expected NoEligibleUnit, got {other:?}"),
    }

    assert_eq!(store.unit(UnitId(1)).unwrap().status, UnitStatus::Available);
    assert_eq!(store.incident(IncidentId(10)).unwrap().status, IncidentStatus::Pending);
    assert!(broadcaster.events.lock().unwrap().is_empty());
}

#[test]
fn jammed_shortcut_loses_to_clear_detour() {
    // The direct route hugs a HIGH jam for its whole length; the detour runs
    // 10 % longer but stays clear.
    let hugging: Vec<GeoPoint> =
        (0..=40).map(|i| GeoPoint::new(0.0, i as f64 * 0.0005)).collect();
    let detour: Vec<GeoPoint> =
        (0..=40).map(|i| GeoPoint::new(0.005, i as f64 * 0.0005)).collect();
    let hug_route = {
        let distance_m = ems_core::geo::path_length_m(&hugging);
        Route::from_points(hugging, distance_m, 100.0)
    };
    let detour_route = {
        let distance_m = ems_core::geo::path_length_m(&detour);
        Route::from_points(detour, distance_m, 110.0)
    };

    let jam = TrafficSegment::new(
        SegmentId(1),
        Some("Hauptstrasse".into()),
        JamLevel::High,
        vec![GeoPoint::new(0.00045, 0.0), GeoPoint::new(0.00045, 0.02)],
        true,
    )
    .unwrap();

    let (d, store, _) = dispatcher(
        Arc::new(TwoRouteProvider { first: hug_route, second: detour_route }),
        TrafficIndex::build(vec![jam]),
    );
    seed_unit(&store, 1, 0.027);
    seed_incident(&store, 10);

    let outcome = d.dispatch(IncidentId(10)).unwrap();
    assert_eq!(outcome.routing_source, RoutingSource::OsrmFullGeometry);
    // Every selected waypoint sits on the detour's latitude.
    assert!(outcome.route_positions.iter().all(|p| p.lat > 0.004));
    assert!((outcome.duration_s.unwrap() - 110.0).abs() < 1e-9);
}

#[test]
fn fresh_dispatch_progress_sits_on_the_ramp() {
    let (d, store, _) = dispatcher(Arc::new(StraightLineProvider), TrafficIndex::empty());
    seed_unit(&store, 1, 0.027);
    seed_incident(&store, 10);
    d.dispatch(IncidentId(10)).unwrap();

    // Seconds after dispatch, a GPS fix at the start of the route.
    let progress = d
        .report_position(
            UnitId(1),
            GpsReport {
                position:    GeoPoint::new(0.027, 0.0),
                accuracy_m:  Some(4.0),
                speed_mps:   Some(12.0),
                heading_deg: Some(180.0),
            },
        )
        .unwrap()
        .unwrap();
    assert!((0.05..=0.087).contains(&progress), "got {progress}");
}

#[test]
fn completion_releases_everything() {
    let (d, store, broadcaster) =
        dispatcher(Arc::new(StraightLineProvider), TrafficIndex::empty());
    seed_unit(&store, 1, 0.027);
    seed_incident(&store, 10);
    d.dispatch(IncidentId(10)).unwrap();

    let outcome = d.complete(IncidentId(10)).unwrap();
    assert_eq!(outcome.unit_id, Some(UnitId(1)));
    assert_eq!(outcome.routes_cleared, 1);

    assert_eq!(store.unit(UnitId(1)).unwrap().status, UnitStatus::Available);
    assert_eq!(store.incident(IncidentId(10)).unwrap().status, IncidentStatus::Completed);
    assert!(store.active_route(UnitId(1), IncidentId(10)).unwrap().is_none());

    let events = broadcaster.events.lock().unwrap();
    assert!(matches!(
        events.last(),
        Some(TrackingEvent::IncidentCompleted { routes_cleared: 1, .. })
    ));
    // The release is announced before the completion itself.
    assert!(matches!(
        events[events.len() - 2],
        TrackingEvent::UnitStatus { unit_id: UnitId(1), status: UnitStatus::Available, .. }
    ));
}

#[test]
fn gps_fix_without_active_route_only_updates_the_registry() {
    let (d, store, broadcaster) =
        dispatcher(Arc::new(StraightLineProvider), TrafficIndex::empty());
    seed_unit(&store, 1, 0.027);

    let progress = d
        .report_position(
            UnitId(1),
            GpsReport {
                position:    GeoPoint::new(0.028, 0.001),
                accuracy_m:  None,
                speed_mps:   None,
                heading_deg: None,
            },
        )
        .unwrap();
    assert!(progress.is_none());
    assert_eq!(store.unit(UnitId(1)).unwrap().position, GeoPoint::new(0.028, 0.001));
    assert!(broadcaster.events.lock().unwrap().is_empty());
}

#[test]
fn store_feed_mirrors_assignments() {
    let (d, store, _) = dispatcher(Arc::new(StraightLineProvider), TrafficIndex::empty());
    seed_unit(&store, 1, 0.027);
    seed_incident(&store, 10);
    d.dispatch(IncidentId(10)).unwrap();

    let feed = StoreAssignmentFeed::new(Arc::clone(&store));
    let assignments = feed.active_assignments().unwrap();
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0].unit, UnitId(1));
    assert_eq!(assignments[0].incident, IncidentId(10));
    assert_eq!(assignments[0].start, GeoPoint::new(0.027, 0.0));
    assert_eq!(assignments[0].end, INCIDENT_AT);

    d.complete(IncidentId(10)).unwrap();
    assert!(feed.active_assignments().unwrap().is_empty());
}
