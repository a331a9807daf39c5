//! Synthetic movement for units with no live GPS feed.
//!
//! A dedicated worker thread ticks every 2 seconds: for each currently
//! assigned incident it advances the unit's progress a fixed 2 % step,
//! interpolates a position between the route's start and end, records it in
//! the registry, and broadcasts it.  Units with a recent real GPS fix are
//! left alone.  A failing tick is logged and followed by a longer sleep;
//! the loop itself only exits through [`SimulatorHandle::shutdown`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, info, warn};

use ems_core::{GeoPoint, IncidentId, LegStatus, RouteId, UnitId};

use crate::broadcast::{Broadcaster, TrackingEvent};
use crate::registry::{LiveLocation, LiveLocationRegistry, LocationSource};
use crate::tracker::ProgressTracker;
use crate::TrackingResult;

/// Normal pause between ticks.
pub const TICK_INTERVAL: Duration = Duration::from_secs(2);

/// Pause after a failed tick.
pub const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Synthetic progress added per tick.
pub const TICK_PROGRESS_STEP: f64 = 0.02;

/// A real GPS fix younger than this suppresses simulation for its unit.
pub const GPS_FRESH_S: i64 = 15;

/// Everything the simulator needs to know about one active assignment.
#[derive(Debug, Clone)]
pub struct SimAssignment {
    pub unit:          UnitId,
    pub incident:      IncidentId,
    pub route:         RouteId,
    /// Unit position at dispatch time.
    pub start:         GeoPoint,
    /// Incident location.
    pub end:           GeoPoint,
    pub duration_s:    Option<f64>,
    /// Unix seconds of the dispatch.
    pub dispatched_at: i64,
}

/// Source of the simulator's per-tick work list — normally the dispatch
/// store's `ASSIGNED` incidents, joined with their cached routes.
pub trait AssignmentFeed: Send + Sync {
    fn active_assignments(&self) -> TrackingResult<Vec<SimAssignment>>;
}

/// The background movement loop.
pub struct MovementSimulator {
    feed:        Arc<dyn AssignmentFeed>,
    registry:    Arc<LiveLocationRegistry>,
    broadcaster: Arc<dyn Broadcaster>,
    tracker:     Arc<Mutex<ProgressTracker>>,
}

impl MovementSimulator {
    pub fn new(
        feed: Arc<dyn AssignmentFeed>,
        registry: Arc<LiveLocationRegistry>,
        broadcaster: Arc<dyn Broadcaster>,
        tracker: Arc<Mutex<ProgressTracker>>,
    ) -> Self {
        Self { feed, registry, broadcaster, tracker }
    }

    /// Start the worker thread.  Dropping (or calling `shutdown` on) the
    /// returned handle stops it.
    pub fn spawn(self) -> SimulatorHandle {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let thread = std::thread::Builder::new()
            .name("movement-sim".into())
            .spawn(move || self.run(&flag))
            .ok();
        if thread.is_none() {
            warn!("movement simulator thread failed to start");
        }
        SimulatorHandle { running, thread }
    }

    fn run(&self, running: &AtomicBool) {
        info!("movement simulator started");
        while running.load(Ordering::Relaxed) {
            let pause = match self.tick() {
                Ok(advanced) => {
                    debug!("simulator tick advanced {advanced} unit(s)");
                    TICK_INTERVAL
                }
                // One bad cycle never kills the loop.
                Err(e) => {
                    warn!("simulator tick failed: {e}; backing off");
                    ERROR_BACKOFF
                }
            };
            sleep_responsive(pause, running);
        }
        info!("movement simulator stopped");
    }

    /// One pass over the assigned incidents.  Returns how many units moved.
    pub(crate) fn tick(&self) -> TrackingResult<usize> {
        let assignments = self.feed.active_assignments()?;
        let now = now_secs();
        let mut advanced = 0;

        for a in assignments {
            // A live device report wins over synthesis.
            if let Some(latest) = self.registry.latest(a.unit)
                && latest.source == LocationSource::Gps
                && now - latest.timestamp < GPS_FRESH_S
            {
                continue;
            }

            let elapsed = (now - a.dispatched_at).max(0) as f64;
            let progress = {
                let mut tracker = self.tracker.lock().unwrap_or_else(|e| e.into_inner());
                // Establish the time-based floor, then add this tick's step.
                tracker.observe(a.unit, a.incident, a.route, elapsed, &[], a.duration_s, None);
                tracker.advance(a.unit, a.incident, a.route, TICK_PROGRESS_STEP)
            };

            let position = a.start.lerp(a.end, progress);
            let status = LegStatus::from_progress(progress);
            self.registry.record(LiveLocation {
                unit:        a.unit,
                position,
                source:      LocationSource::Simulated,
                progress:    Some(progress),
                status:      Some(status),
                incident:    Some(a.incident),
                accuracy_m:  None,
                speed_mps:   None,
                heading_deg: None,
                timestamp:   now,
            });
            self.broadcaster.publish(&TrackingEvent::UnitLocation {
                unit_id:      a.unit,
                latitude:     position.lat,
                longitude:    position.lon,
                status,
                progress,
                emergency_id: Some(a.incident),
                timestamp:    now,
            });
            advanced += 1;
        }
        Ok(advanced)
    }
}

/// Owns the worker thread; stops it on shutdown or drop.
pub struct SimulatorHandle {
    running: Arc<AtomicBool>,
    thread:  Option<JoinHandle<()>>,
}

impl SimulatorHandle {
    /// Signal the loop to stop and wait for the thread to exit.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for SimulatorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Sleep in short slices so shutdown is not delayed by a full backoff.
fn sleep_responsive(total: Duration, running: &AtomicBool) {
    let slice = Duration::from_millis(100);
    let mut remaining = total;
    while !remaining.is_zero() && running.load(Ordering::Relaxed) {
        let step = remaining.min(slice);
        std::thread::sleep(step);
        remaining -= step;
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
