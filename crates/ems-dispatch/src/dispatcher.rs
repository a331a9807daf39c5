//! The dispatch orchestrator.
//!
//! `Dispatcher` glues the layers together for the three operations the
//! outer API layer triggers:
//!
//! - [`Dispatcher::dispatch`] — nearest unit, candidate routes, traffic-aware
//!   selection, route-cache write, assignment broadcast.
//! - [`Dispatcher::complete`] — release the unit, deactivate routes, clear
//!   tracking state, completion broadcast.
//! - [`Dispatcher::report_position`] — feed a live GPS fix into progress
//!   tracking and the registry, broadcasting the updated location.
//!
//! Routing-provider failures never surface from here: they degrade inside
//! ems-routing down to a geometry-less dispatch.  The only user-visible
//! dispatch failure is "no eligible unit".

use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use log::info;

use ems_core::{GeoPoint, IncidentId, LegStatus, UnitId, UnitStatus, polyline};
use ems_routing::{
    CandidateGenerator, RouteProvider, RouteSelector, RoutingSource, UnitCandidate, nearest_unit,
};
use ems_store::{NewRoute, Store};
use ems_traffic::{TrafficIndex, TrafficOverlay};
use ems_tracking::{
    Broadcaster, LiveLocation, LiveLocationRegistry, LocationSource, ProgressTracker,
    TrackingEvent,
};

use crate::DispatchResult;

/// One live device report.
#[derive(Debug, Clone, Copy)]
pub struct GpsReport {
    pub position:    GeoPoint,
    pub accuracy_m:  Option<f64>,
    pub speed_mps:   Option<f64>,
    pub heading_deg: Option<f64>,
}

/// What a successful dispatch returns to the API layer.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DispatchOutcome {
    pub assigned_unit_id: UnitId,
    pub distance_m:       f64,
    pub duration_s:       Option<f64>,
    pub waypoint_count:   usize,
    pub route_positions:  Vec<GeoPoint>,
    pub routing_source:   RoutingSource,
}

/// What a completion returns.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct CompletionOutcome {
    pub emergency_id:   IncidentId,
    pub unit_id:        Option<UnitId>,
    pub routes_cleared: usize,
}

/// Orchestrates dispatch, completion, and live position intake.
pub struct Dispatcher {
    store:       Arc<Store>,
    primary:     Arc<dyn RouteProvider>,
    secondary:   Option<Arc<dyn RouteProvider>>,
    traffic:     TrafficIndex,
    registry:    Arc<LiveLocationRegistry>,
    broadcaster: Arc<dyn Broadcaster>,
    tracker:     Arc<Mutex<ProgressTracker>>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<Store>,
        primary: Arc<dyn RouteProvider>,
        traffic: TrafficIndex,
        registry: Arc<LiveLocationRegistry>,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Self {
        Self {
            store,
            primary,
            secondary: None,
            traffic,
            registry,
            broadcaster,
            tracker: Arc::new(Mutex::new(ProgressTracker::new())),
        }
    }

    /// Add a secondary routing vendor for candidate generation.
    pub fn with_secondary(mut self, provider: Arc<dyn RouteProvider>) -> Self {
        self.secondary = Some(provider);
        self
    }

    /// The shared progress tracker, for wiring into the movement simulator.
    pub fn tracker(&self) -> Arc<Mutex<ProgressTracker>> {
        Arc::clone(&self.tracker)
    }

    /// Assign the best unit and route to an incident.
    pub fn dispatch(&self, id: IncidentId) -> DispatchResult<DispatchOutcome> {
        let incident = self.store.incident(id)?;

        let pool: Vec<UnitCandidate> = self
            .store
            .available_units(incident.kind)?
            .iter()
            .map(|u| UnitCandidate { unit: u.id, position: u.position })
            .collect();
        let nearest = nearest_unit(&*self.primary, incident.location, &pool)?;

        let mut generator = CandidateGenerator::new(&*self.primary);
        if let Some(secondary) = &self.secondary {
            generator = generator.with_secondary(&**secondary);
        }
        let candidates = generator.generate(nearest.position, incident.location);

        let selected = RouteSelector::new(TrafficOverlay::new(&self.traffic)).select(
            candidates,
            nearest.distance_m,
            nearest.duration_s,
        );

        let (geometry, waypoints) = match &selected.route {
            Some(route) => {
                let waypoints = polyline::cap_waypoints(&route.points);
                // The stored geometry must decode to the same point list the
                // record's waypoint count advertises; re-encode when the cap
                // trimmed the raw provider geometry.
                let geometry = if waypoints.len() < route.points.len() {
                    polyline::encode(&waypoints)
                } else {
                    route.geometry.clone()
                };
                (Some(geometry), waypoints)
            }
            None => (None, Vec::new()),
        };

        self.store.assign(NewRoute {
            unit:           nearest.unit,
            incident:       id,
            geometry,
            waypoints:      waypoints.clone(),
            distance_m:     selected.distance_m,
            duration_s:     selected.duration_s,
            start:          nearest.position,
            end:            incident.location,
            routing_source: selected.source.as_str().to_owned(),
        })?;

        self.broadcaster.publish(&TrackingEvent::IncidentAssigned {
            emergency_id: id,
            unit_id:      nearest.unit,
            distance_m:   selected.distance_m,
            timestamp:    now_secs(),
        });
        self.broadcaster.publish(&TrackingEvent::UnitStatus {
            unit_id:      nearest.unit,
            status:       UnitStatus::Dispatched,
            emergency_id: Some(id),
            timestamp:    now_secs(),
        });
        info!(
            "dispatched {} to {} ({:.0} m, {} waypoint(s), {})",
            nearest.unit,
            id,
            selected.distance_m,
            waypoints.len(),
            selected.source.as_str()
        );

        Ok(DispatchOutcome {
            assigned_unit_id: nearest.unit,
            distance_m:       selected.distance_m,
            duration_s:       selected.duration_s,
            waypoint_count:   waypoints.len(),
            route_positions:  waypoints,
            routing_source:   selected.source,
        })
    }

    /// Close an incident, release its unit, and deactivate its routes.
    pub fn complete(&self, id: IncidentId) -> DispatchResult<CompletionOutcome> {
        let done = self.store.complete(id)?;

        if let Some(unit) = done.unit {
            self.tracker.lock().unwrap_or_else(|e| e.into_inner()).forget(unit, id);
            self.registry.clear(unit);
            self.broadcaster.publish(&TrackingEvent::UnitStatus {
                unit_id:      unit,
                status:       UnitStatus::Available,
                emergency_id: Some(id),
                timestamp:    now_secs(),
            });
        }
        self.broadcaster.publish(&TrackingEvent::IncidentCompleted {
            emergency_id:   id,
            unit_id:        done.unit,
            routes_cleared: done.routes_cleared,
            timestamp:      now_secs(),
        });
        info!("completed {id}: released {:?}, {} route(s) cleared", done.unit, done.routes_cleared);

        Ok(CompletionOutcome {
            emergency_id:   id,
            unit_id:        done.unit,
            routes_cleared: done.routes_cleared,
        })
    }

    /// Ingest a live GPS fix.  Returns the updated progress when the unit
    /// has an active route.
    pub fn report_position(&self, unit: UnitId, report: GpsReport) -> DispatchResult<Option<f64>> {
        self.store.update_unit_position(unit, report.position)?;

        let now = now_secs();
        let active = self.store.active_route_for_unit(unit)?;

        let (progress, incident) = match &active {
            Some(route) => {
                let progress = route.incident.map(|incident| {
                    let elapsed = (now - route.created_at).max(0) as f64;
                    self.tracker.lock().unwrap_or_else(|e| e.into_inner()).observe(
                        unit,
                        incident,
                        route.id,
                        elapsed,
                        &route.waypoints,
                        route.duration_s,
                        Some(report.position),
                    )
                });
                (progress, route.incident)
            }
            None => (None, None),
        };

        let status = progress.map(LegStatus::from_progress);
        self.registry.record(LiveLocation {
            unit,
            position: report.position,
            source: LocationSource::Gps,
            progress,
            status,
            incident,
            accuracy_m: report.accuracy_m,
            speed_mps: report.speed_mps,
            heading_deg: report.heading_deg,
            timestamp: now,
        });

        if let (Some(progress), Some(status)) = (progress, status) {
            self.broadcaster.publish(&TrackingEvent::UnitLocation {
                unit_id:      unit,
                latitude:     report.position.lat,
                longitude:    report.position.lon,
                status,
                progress,
                emergency_id: incident,
                timestamp:    now,
            });
        }
        Ok(progress)
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
