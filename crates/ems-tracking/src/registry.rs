//! The in-memory live-location registry.
//!
//! One registry instance is created at process start and shared (behind
//! `Arc`) by the GPS-update handler, the movement simulator, and anything
//! that answers "where is everyone" queries for new subscribers.  All state
//! sits behind a single mutex; entries are small and updates are a few
//! hundred per second at most.

use std::collections::VecDeque;
use std::sync::Mutex;

use rustc_hash::FxHashMap;

use ems_core::{GeoPoint, IncidentId, LegStatus, UnitId};

/// Retained history entries per unit.
pub const HISTORY_LIMIT: usize = 100;

/// Where a location fix came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    /// A real device report.
    Gps,
    /// Synthesized by the movement simulator.
    Simulated,
}

/// One unit's most recent known state.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct LiveLocation {
    pub unit:        UnitId,
    pub position:    GeoPoint,
    pub source:      LocationSource,
    /// Progress along the active route, when one exists.
    pub progress:    Option<f64>,
    pub status:      Option<LegStatus>,
    pub incident:    Option<IncidentId>,
    pub accuracy_m:  Option<f64>,
    pub speed_mps:   Option<f64>,
    pub heading_deg: Option<f64>,
    /// Unix seconds.
    pub timestamp:   i64,
}

#[derive(Default)]
struct Inner {
    latest:  FxHashMap<UnitId, LiveLocation>,
    history: FxHashMap<UnitId, VecDeque<LiveLocation>>,
}

/// Shared map of unit id → latest location, with a bounded per-unit history.
#[derive(Default)]
pub struct LiveLocationRegistry {
    inner: Mutex<Inner>,
}

impl LiveLocationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new fix, superseding the previous one and appending to the
    /// unit's history (oldest entries fall off past [`HISTORY_LIMIT`]).
    pub fn record(&self, location: LiveLocation) {
        let mut inner = self.lock();
        let history = inner.history.entry(location.unit).or_default();
        if history.len() == HISTORY_LIMIT {
            history.pop_front();
        }
        history.push_back(location.clone());
        inner.latest.insert(location.unit, location);
    }

    /// The most recent fix for one unit.
    pub fn latest(&self, unit: UnitId) -> Option<LiveLocation> {
        self.lock().latest.get(&unit).cloned()
    }

    /// Every unit's latest fix, in unit-id order — the catch-up payload for
    /// a freshly connected subscriber.
    pub fn snapshot(&self) -> Vec<LiveLocation> {
        let inner = self.lock();
        let mut all: Vec<LiveLocation> = inner.latest.values().cloned().collect();
        all.sort_by_key(|l| l.unit);
        all
    }

    /// Recent fixes for one unit, oldest first.
    pub fn history(&self, unit: UnitId) -> Vec<LiveLocation> {
        self.lock()
            .history
            .get(&unit)
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop all state for a unit (completion or decommissioning).
    pub fn clear(&self, unit: UnitId) {
        let mut inner = self.lock();
        inner.latest.remove(&unit);
        inner.history.remove(&unit);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
