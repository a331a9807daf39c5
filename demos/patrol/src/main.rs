//! patrol — runnable walkthrough of the emergency dispatch core.
//!
//! Seeds an in-memory store with a few Berlin-ish units and incidents plus
//! one HIGH-jam traffic segment, dispatches, lets the movement simulator
//! animate the units for a few ticks, feeds one live GPS fix, and completes
//! everything.
//!
//! By default a built-in synthetic routing provider is used so the demo runs
//! offline.  Set `EMS_OSRM_URL` (e.g. `https://router.project-osrm.org`) to
//! route against a real OSRM instance instead.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;

use ems_core::{
    GeoPoint, IncidentId, IncidentStatus, JamLevel, SegmentId, ServiceKind, UnitId, UnitStatus,
};
use ems_dispatch::{Dispatcher, GpsReport, StoreAssignmentFeed};
use ems_routing::{
    OsrmProvider, Route, RouteProvider, RouteSummary, RoutingError, RoutingResult,
};
use ems_store::{IncidentRecord, Store, UnitRecord};
use ems_tracking::{
    Broadcaster, LiveLocationRegistry, MovementSimulator, ProgressTracker, TrackingEvent,
};
use ems_traffic::{TrafficIndex, TrafficSegment};

// ── Constants ─────────────────────────────────────────────────────────────────

const SIM_SECONDS: u64 = 7; // ~3 simulator ticks

// ── Synthetic routing provider ────────────────────────────────────────────────

/// Straight-line routes at ~54 km/h, plus one slightly longer parallel
/// alternative so the selector has something to choose between.
struct SyntheticProvider;

fn line(from: GeoPoint, to: GeoPoint, lat_shift: f64, slow_down: f64) -> Route {
    let points: Vec<GeoPoint> = (0..=24)
        .map(|i| {
            let t = i as f64 / 24.0;
            let p = from.lerp(to, t);
            // Bow the alternative away from the corridor, pinned at the ends.
            let bow = lat_shift * (std::f64::consts::PI * t).sin();
            GeoPoint::new(p.lat + bow, p.lon)
        })
        .collect();
    let distance_m = ems_core::geo::path_length_m(&points);
    Route::from_points(points, distance_m, distance_m / 15.0 * slow_down)
}

impl RouteProvider for SyntheticProvider {
    fn name(&self) -> &'static str {
        "synthetic"
    }
    fn summary(&self, from: GeoPoint, to: GeoPoint) -> RoutingResult<RouteSummary> {
        let distance_m = from.distance_m(to);
        Ok(RouteSummary { distance_m, duration_s: distance_m / 15.0 })
    }
    fn alternatives(&self, from: GeoPoint, to: GeoPoint) -> RoutingResult<Vec<Route>> {
        Ok(vec![line(from, to, 0.0, 1.0), line(from, to, 0.004, 1.12)])
    }
    fn via(&self, _: GeoPoint, _: GeoPoint, _: GeoPoint) -> RoutingResult<Route> {
        Err(RoutingError::NoRoute)
    }
}

// ── Broadcast to stdout ───────────────────────────────────────────────────────

struct JsonBroadcaster;

impl Broadcaster for JsonBroadcaster {
    fn publish(&self, event: &TrackingEvent) {
        match serde_json::to_string(event) {
            Ok(json) => println!("  event: {json}"),
            Err(e) => eprintln!("  event serialization failed: {e}"),
        }
    }
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::init();

    println!("=== patrol — emergency dispatch core demo ===");
    println!();

    // 1. Store with two ambulances and one fire engine around Alexanderplatz.
    let store = Arc::new(Store::open_in_memory()?);
    for (id, kind, lat, lon) in [
        (1, ServiceKind::Ambulance, 52.530, 13.400),
        (2, ServiceKind::Ambulance, 52.560, 13.430),
        (3, ServiceKind::Fire, 52.515, 13.390),
    ] {
        store.insert_unit(&UnitRecord {
            id:        UnitId(id),
            call_sign: format!("{kind}-{id}"),
            kind,
            status:    UnitStatus::Available,
            position:  GeoPoint::new(lat, lon),
        })?;
    }
    for (id, kind, lat, lon) in [
        (100, ServiceKind::Ambulance, 52.520, 13.410),
        (101, ServiceKind::Fire, 52.508, 13.376),
    ] {
        store.insert_incident(&IncidentRecord {
            id:            IncidentId(id),
            kind,
            status:        IncidentStatus::Pending,
            location:      GeoPoint::new(lat, lon),
            assigned_unit: None,
            created_at:    0,
        })?;
    }
    println!("Seeded {} unit(s), 2 incident(s)", store.units()?.len());

    // 2. One HIGH jam right on the direct ambulance corridor.
    let jam = TrafficSegment::new(
        SegmentId(1),
        Some("Karl-Liebknecht-Strasse".into()),
        JamLevel::High,
        vec![GeoPoint::new(52.5245, 13.4045), GeoPoint::new(52.5255, 13.4055)],
        true,
    )?;
    let traffic = TrafficIndex::build(vec![jam]);
    println!("Traffic overlay: {} active segment(s)", traffic.len());

    // 3. Routing provider: real OSRM when configured, synthetic otherwise.
    let provider: Arc<dyn RouteProvider> = match std::env::var("EMS_OSRM_URL") {
        Ok(url) => {
            println!("Routing via OSRM at {url}");
            Arc::new(OsrmProvider::new(url)?)
        }
        Err(_) => {
            println!("Routing via built-in synthetic provider (set EMS_OSRM_URL for OSRM)");
            Arc::new(SyntheticProvider)
        }
    };

    // 4. Wire the dispatcher.
    let registry = Arc::new(LiveLocationRegistry::new());
    let broadcaster: Arc<dyn Broadcaster> = Arc::new(JsonBroadcaster);
    let dispatcher = Dispatcher::new(
        Arc::clone(&store),
        provider,
        traffic,
        Arc::clone(&registry),
        Arc::clone(&broadcaster),
    );
    let tracker: Arc<Mutex<ProgressTracker>> = dispatcher.tracker();

    // 5. Dispatch both incidents.
    println!();
    for id in [IncidentId(100), IncidentId(101)] {
        let outcome = dispatcher.dispatch(id)?;
        println!(
            "dispatch {id}: {} | {:.0} m | {} waypoint(s) | {}",
            outcome.assigned_unit_id,
            outcome.distance_m,
            outcome.waypoint_count,
            outcome.routing_source.as_str(),
        );
    }

    // 6. Start the movement simulator and let it animate for a few ticks.
    println!();
    println!("Simulating movement for {SIM_SECONDS} s …");
    let feed = Arc::new(StoreAssignmentFeed::new(Arc::clone(&store)));
    let handle = MovementSimulator::new(
        feed,
        Arc::clone(&registry),
        Arc::clone(&broadcaster),
        Arc::clone(&tracker),
    )
    .spawn();
    std::thread::sleep(Duration::from_secs(SIM_SECONDS));

    // 7. A live GPS fix overrides simulation for unit 1.
    println!();
    let progress = dispatcher.report_position(
        UnitId(1),
        GpsReport {
            position:    GeoPoint::new(52.5252, 13.4048),
            accuracy_m:  Some(6.0),
            speed_mps:   Some(11.0),
            heading_deg: Some(135.0),
        },
    )?;
    println!("GPS fix for UnitId(1): progress now {progress:?}");

    // 8. Where is everyone?
    println!();
    println!("{:<10} {:<11} {:<11} {:<9} {:<10}", "Unit", "Lat", "Lon", "Progress", "Status");
    println!("{}", "-".repeat(54));
    for loc in registry.snapshot() {
        println!(
            "{:<10} {:<11.5} {:<11.5} {:<9} {:<10}",
            loc.unit.0,
            loc.position.lat,
            loc.position.lon,
            loc.progress.map(|p| format!("{p:.3}")).unwrap_or_else(|| "-".into()),
            loc.status.map(|s| s.as_str()).unwrap_or("-"),
        );
    }

    // 9. Complete both incidents and stop the simulator.
    println!();
    for id in [IncidentId(100), IncidentId(101)] {
        let outcome = dispatcher.complete(id)?;
        println!(
            "complete {id}: released {:?}, {} route(s) deactivated",
            outcome.unit_id, outcome.routes_cleared
        );
    }
    handle.shutdown();

    println!();
    println!("Done.");
    Ok(())
}
