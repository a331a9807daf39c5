//! SQLite-backed dispatch store.
//!
//! One `Store` owns one connection behind a mutex; dispatch and completion
//! run as explicit transactions on it, so their status gates and the
//! deactivate-then-insert route swap are atomic with respect to concurrent
//! dispatches of the same unit.  At most one `active = 1` route row exists
//! per unit at any instant.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};
use rusqlite::{Connection, OptionalExtension};

use ems_core::{GeoPoint, IncidentId, IncidentStatus, RouteId, ServiceKind, UnitId, UnitStatus, polyline};

use crate::error::{StoreError, StoreResult};
use crate::records::{
    AssignmentRecorded, CompletionRecorded, IncidentRecord, NewRoute, RouteRecord, UnitRecord,
};

const SCHEMA: &str = "
    PRAGMA journal_mode = WAL;
    PRAGMA synchronous  = NORMAL;
    CREATE TABLE IF NOT EXISTS units (
        id        INTEGER PRIMARY KEY,
        call_sign TEXT    NOT NULL,
        kind      TEXT    NOT NULL,
        status    TEXT    NOT NULL,
        lat       REAL    NOT NULL,
        lon       REAL    NOT NULL
    );
    CREATE TABLE IF NOT EXISTS incidents (
        id            INTEGER PRIMARY KEY,
        kind          TEXT    NOT NULL,
        status        TEXT    NOT NULL,
        lat           REAL    NOT NULL,
        lon           REAL    NOT NULL,
        assigned_unit INTEGER,
        created_at    INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS route_records (
        id             INTEGER PRIMARY KEY AUTOINCREMENT,
        unit_id        INTEGER NOT NULL,
        incident_id    INTEGER,
        geometry       TEXT,
        waypoints      TEXT    NOT NULL,
        distance_m     REAL    NOT NULL,
        duration_s     REAL,
        start_lat      REAL    NOT NULL,
        start_lon      REAL    NOT NULL,
        end_lat        REAL    NOT NULL,
        end_lon        REAL    NOT NULL,
        routing_source TEXT    NOT NULL,
        active         INTEGER NOT NULL DEFAULT 1,
        created_at     INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS route_records_unit_active
        ON route_records (unit_id, active);
    CREATE INDEX IF NOT EXISTS route_records_incident_active
        ON route_records (incident_id, active);
";

const ROUTE_COLUMNS: &str = "id, unit_id, incident_id, geometry, waypoints, distance_m, \
                             duration_s, start_lat, start_lon, end_lat, end_lon, \
                             routing_source, active, created_at";

/// Units, incidents, and the route cache, in one SQLite database.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the database at `path` and initialise the schema.
    pub fn open(path: &Path) -> StoreResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// In-memory database, used by tests and throwaway demos.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A poisoning panic cannot leave a half-applied transaction behind
        // (rusqlite rolls back on drop), so the guard is still usable.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ── Units ─────────────────────────────────────────────────────────────

    pub fn insert_unit(&self, unit: &UnitRecord) -> StoreResult<()> {
        self.lock().execute(
            "INSERT INTO units (id, call_sign, kind, status, lat, lon) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                unit.id.0,
                unit.call_sign,
                unit.kind.as_str(),
                unit.status.as_str(),
                unit.position.lat,
                unit.position.lon,
            ],
        )?;
        Ok(())
    }

    pub fn unit(&self, id: UnitId) -> StoreResult<UnitRecord> {
        unit_row(&self.lock(), id)
    }

    /// All units, in id order.
    pub fn units(&self) -> StoreResult<Vec<UnitRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT id, call_sign, kind, status, lat, lon FROM units ORDER BY id",
        )?;
        let raws = stmt
            .query_map([], raw_unit)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raws.into_iter().map(finish_unit).collect()
    }

    /// `AVAILABLE` units of the given capability — the nearest-unit pool.
    pub fn available_units(&self, kind: ServiceKind) -> StoreResult<Vec<UnitRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT id, call_sign, kind, status, lat, lon FROM units \
             WHERE kind = ?1 AND status = ?2 ORDER BY id",
        )?;
        let raws = stmt
            .query_map(
                rusqlite::params![kind.as_str(), UnitStatus::Available.as_str()],
                raw_unit,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raws.into_iter().map(finish_unit).collect()
    }

    /// Record a unit's latest known position.
    pub fn update_unit_position(&self, id: UnitId, position: GeoPoint) -> StoreResult<()> {
        let changed = self.lock().execute(
            "UPDATE units SET lat = ?1, lon = ?2 WHERE id = ?3",
            rusqlite::params![position.lat, position.lon, id.0],
        )?;
        if changed == 0 {
            return Err(StoreError::UnitNotFound(id));
        }
        Ok(())
    }

    // ── Incidents ─────────────────────────────────────────────────────────

    pub fn insert_incident(&self, incident: &IncidentRecord) -> StoreResult<()> {
        self.lock().execute(
            "INSERT INTO incidents (id, kind, status, lat, lon, assigned_unit, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                incident.id.0,
                incident.kind.as_str(),
                incident.status.as_str(),
                incident.location.lat,
                incident.location.lon,
                incident.assigned_unit.map(|u| u.0),
                incident.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn incident(&self, id: IncidentId) -> StoreResult<IncidentRecord> {
        incident_row(&self.lock(), id)
    }

    /// Incidents currently in `ASSIGNED` status — the simulator's work list.
    pub fn assigned_incidents(&self) -> StoreResult<Vec<IncidentRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT id, kind, status, lat, lon, assigned_unit, created_at FROM incidents \
             WHERE status = ?1 ORDER BY id",
        )?;
        let raws = stmt
            .query_map([IncidentStatus::Assigned.as_str()], raw_incident)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raws.into_iter().map(finish_incident).collect()
    }

    // ── Dispatch / completion transactions ────────────────────────────────

    /// Commit a dispatch: gate both statuses, mark the unit `DISPATCHED` and
    /// the incident `ASSIGNED`, deactivate any stale active route of the
    /// unit, and insert the new active route — all in one transaction.
    ///
    /// Waypoints are capped to 245 points here, so the invariant holds no
    /// matter what the caller passes.
    pub fn assign(&self, route: NewRoute) -> StoreResult<AssignmentRecorded> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let unit = unit_row(&tx, route.unit)?;
        if unit.status != UnitStatus::Available {
            return Err(StoreError::UnitNotAvailable { unit: unit.id, status: unit.status });
        }
        let incident = incident_row(&tx, route.incident)?;
        if !matches!(incident.status, IncidentStatus::Pending | IncidentStatus::Approved) {
            return Err(StoreError::IncidentNotOpen {
                incident: incident.id,
                status:   incident.status,
            });
        }

        tx.execute(
            "UPDATE units SET status = ?1 WHERE id = ?2",
            rusqlite::params![UnitStatus::Dispatched.as_str(), unit.id.0],
        )?;
        tx.execute(
            "UPDATE incidents SET status = ?1, assigned_unit = ?2 WHERE id = ?3",
            rusqlite::params![IncidentStatus::Assigned.as_str(), unit.id.0, incident.id.0],
        )?;

        // Stale active routes corrupt progress computation; switch them off
        // before the new one exists.
        let deactivated = tx.execute(
            "UPDATE route_records SET active = 0 WHERE unit_id = ?1 AND active = 1",
            [unit.id.0],
        )?;

        let waypoints = polyline::cap_waypoints(&route.waypoints);
        // Keep the persisted geometry in lockstep with the capped waypoint
        // list; a stale full-resolution polyline would decode to a different
        // point count than the record advertises.
        let geometry = match route.geometry {
            Some(_) if waypoints.len() < route.waypoints.len() => {
                Some(polyline::encode(&waypoints))
            }
            other => other,
        };
        let waypoints_json = serde_json::to_string(&waypoints)?;
        tx.execute(
            "INSERT INTO route_records \
             (unit_id, incident_id, geometry, waypoints, distance_m, duration_s, \
              start_lat, start_lon, end_lat, end_lon, routing_source, active, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 1, ?12)",
            rusqlite::params![
                unit.id.0,
                incident.id.0,
                geometry,
                waypoints_json,
                route.distance_m,
                route.duration_s,
                route.start.lat,
                route.start.lon,
                route.end.lat,
                route.end.lon,
                route.routing_source,
                now_secs(),
            ],
        )?;
        let route_id = RouteId(tx.last_insert_rowid());
        tx.commit()?;

        info!(
            "assigned {} to {} (route {route_id}, {deactivated} stale route(s) deactivated)",
            unit.id, incident.id
        );
        Ok(AssignmentRecorded { route_id, deactivated })
    }

    /// Commit a completion: the incident becomes `COMPLETED`, its unit
    /// returns to `AVAILABLE`, and every active route for the incident is
    /// deactivated.  Returns the deactivation count for observability.
    pub fn complete(&self, id: IncidentId) -> StoreResult<CompletionRecorded> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let incident = incident_row(&tx, id)?;
        if incident.status != IncidentStatus::Assigned {
            return Err(StoreError::IncidentNotAssigned {
                incident: incident.id,
                status:   incident.status,
            });
        }

        tx.execute(
            "UPDATE incidents SET status = ?1 WHERE id = ?2",
            rusqlite::params![IncidentStatus::Completed.as_str(), id.0],
        )?;
        if let Some(unit) = incident.assigned_unit {
            tx.execute(
                "UPDATE units SET status = ?1 WHERE id = ?2",
                rusqlite::params![UnitStatus::Available.as_str(), unit.0],
            )?;
        }
        let routes_cleared = tx.execute(
            "UPDATE route_records SET active = 0 WHERE incident_id = ?1 AND active = 1",
            [id.0],
        )?;
        tx.commit()?;

        info!("completed {id}: {routes_cleared} route(s) deactivated");
        Ok(CompletionRecorded { unit: incident.assigned_unit, routes_cleared })
    }

    // ── Route cache reads / maintenance ───────────────────────────────────

    /// The unit's single active route, if any.
    pub fn active_route_for_unit(&self, unit: UnitId) -> StoreResult<Option<RouteRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {ROUTE_COLUMNS} FROM route_records \
             WHERE unit_id = ?1 AND active = 1 ORDER BY id DESC LIMIT 1"
        ))?;
        let raw = stmt.query_row([unit.0], raw_route).optional()?;
        raw.map(finish_route).transpose()
    }

    /// The active route for a specific (unit, incident) pair.
    pub fn active_route(
        &self,
        unit: UnitId,
        incident: IncidentId,
    ) -> StoreResult<Option<RouteRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {ROUTE_COLUMNS} FROM route_records \
             WHERE unit_id = ?1 AND incident_id = ?2 AND active = 1 \
             ORDER BY id DESC LIMIT 1"
        ))?;
        let raw = stmt
            .query_row(rusqlite::params![unit.0, incident.0], raw_route)
            .optional()?;
        raw.map(finish_route).transpose()
    }

    /// Drop inactive route rows older than `max_age_secs`.  Housekeeping
    /// only; correctness never depends on it.
    pub fn purge_inactive_older_than(&self, max_age_secs: i64) -> StoreResult<usize> {
        let cutoff = now_secs() - max_age_secs;
        let purged = self.lock().execute(
            "DELETE FROM route_records WHERE active = 0 AND created_at < ?1",
            [cutoff],
        )?;
        debug!("purged {purged} inactive route record(s)");
        Ok(purged)
    }
}

// ── Row mapping ───────────────────────────────────────────────────────────────

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn parse_col<T: std::str::FromStr>(column: &'static str, value: String) -> StoreResult<T> {
    match value.parse::<T>() {
        Ok(v) => Ok(v),
        Err(_) => Err(StoreError::Column { column, value }),
    }
}

struct RawUnit {
    id:        u32,
    call_sign: String,
    kind:      String,
    status:    String,
    lat:       f64,
    lon:       f64,
}

fn raw_unit(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawUnit> {
    Ok(RawUnit {
        id:        row.get(0)?,
        call_sign: row.get(1)?,
        kind:      row.get(2)?,
        status:    row.get(3)?,
        lat:       row.get(4)?,
        lon:       row.get(5)?,
    })
}

fn finish_unit(raw: RawUnit) -> StoreResult<UnitRecord> {
    Ok(UnitRecord {
        id:        UnitId(raw.id),
        call_sign: raw.call_sign,
        kind:      parse_col("kind", raw.kind)?,
        status:    parse_col("status", raw.status)?,
        position:  GeoPoint::new(raw.lat, raw.lon),
    })
}

fn unit_row(conn: &Connection, id: UnitId) -> StoreResult<UnitRecord> {
    let raw = conn
        .query_row(
            "SELECT id, call_sign, kind, status, lat, lon FROM units WHERE id = ?1",
            [id.0],
            raw_unit,
        )
        .optional()?
        .ok_or(StoreError::UnitNotFound(id))?;
    finish_unit(raw)
}

struct RawIncident {
    id:            u32,
    kind:          String,
    status:        String,
    lat:           f64,
    lon:           f64,
    assigned_unit: Option<u32>,
    created_at:    i64,
}

fn raw_incident(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawIncident> {
    Ok(RawIncident {
        id:            row.get(0)?,
        kind:          row.get(1)?,
        status:        row.get(2)?,
        lat:           row.get(3)?,
        lon:           row.get(4)?,
        assigned_unit: row.get(5)?,
        created_at:    row.get(6)?,
    })
}

fn finish_incident(raw: RawIncident) -> StoreResult<IncidentRecord> {
    Ok(IncidentRecord {
        id:            IncidentId(raw.id),
        kind:          parse_col("kind", raw.kind)?,
        status:        parse_col("status", raw.status)?,
        location:      GeoPoint::new(raw.lat, raw.lon),
        assigned_unit: raw.assigned_unit.map(UnitId),
        created_at:    raw.created_at,
    })
}

fn incident_row(conn: &Connection, id: IncidentId) -> StoreResult<IncidentRecord> {
    let raw = conn
        .query_row(
            "SELECT id, kind, status, lat, lon, assigned_unit, created_at \
             FROM incidents WHERE id = ?1",
            [id.0],
            raw_incident,
        )
        .optional()?
        .ok_or(StoreError::IncidentNotFound(id))?;
    finish_incident(raw)
}

struct RawRoute {
    id:             i64,
    unit_id:        u32,
    incident_id:    Option<u32>,
    geometry:       Option<String>,
    waypoints:      String,
    distance_m:     f64,
    duration_s:     Option<f64>,
    start_lat:      f64,
    start_lon:      f64,
    end_lat:        f64,
    end_lon:        f64,
    routing_source: String,
    active:         bool,
    created_at:     i64,
}

fn raw_route(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRoute> {
    Ok(RawRoute {
        id:             row.get(0)?,
        unit_id:        row.get(1)?,
        incident_id:    row.get(2)?,
        geometry:       row.get(3)?,
        waypoints:      row.get(4)?,
        distance_m:     row.get(5)?,
        duration_s:     row.get(6)?,
        start_lat:      row.get(7)?,
        start_lon:      row.get(8)?,
        end_lat:        row.get(9)?,
        end_lon:        row.get(10)?,
        routing_source: row.get(11)?,
        active:         row.get(12)?,
        created_at:     row.get(13)?,
    })
}

fn finish_route(raw: RawRoute) -> StoreResult<RouteRecord> {
    Ok(RouteRecord {
        id:             RouteId(raw.id),
        unit:           UnitId(raw.unit_id),
        incident:       raw.incident_id.map(IncidentId),
        geometry:       raw.geometry,
        waypoints:      serde_json::from_str(&raw.waypoints)?,
        distance_m:     raw.distance_m,
        duration_s:     raw.duration_s,
        start:          GeoPoint::new(raw.start_lat, raw.start_lon),
        end:            GeoPoint::new(raw.end_lat, raw.end_lon),
        routing_source: raw.routing_source,
        active:         raw.active,
        created_at:     raw.created_at,
    })
}
