//! Traffic segment model, CSV loader, and the R-tree prune index.
//!
//! # CSV format
//!
//! One row per segment.  `geometry` is an encoded polyline (same codec as
//! route geometry, precision 1e-5).
//!
//! ```csv
//! id,name,jam_level,active,geometry
//! 1,Ring road west,HIGH,1,_p~iF~ps|U_ulLnnqC
//! 2,,MEDIUM,1,_izlhA~rlgdF_{geC~ywl@
//! 3,Harbour tunnel,LOW,0,_qo]_{semA~s|U~ps|U
//! ```
//!
//! Inactive rows load fine but are excluded from [`TrafficIndex`]; the core
//! only ever classifies against active segments.
//!
//! # Spatial index
//!
//! An R-tree (via `rstar`) over segment bounding boxes.  Classifying one
//! route means a few hundred route segments × every traffic polyline segment
//! in the worst case; the envelope query cuts that to the handful of traffic
//! segments actually near the route corridor.

use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use rstar::{AABB, RTree, RTreeObject};
use serde::Deserialize;

use ems_core::{GeoPoint, JamLevel, SegmentId, polyline};

use crate::{TrafficError, TrafficResult};

// ── TrafficSegment ────────────────────────────────────────────────────────────

/// An operator-drawn congestion polyline.
#[derive(Debug, Clone)]
pub struct TrafficSegment {
    pub id: SegmentId,
    pub name: Option<String>,
    pub jam_level: JamLevel,
    /// Ordered polyline vertices, always ≥ 2 (validated at load).
    pub points: Vec<GeoPoint>,
    pub active: bool,
}

impl TrafficSegment {
    /// Construct with validation.
    pub fn new(
        id: SegmentId,
        name: Option<String>,
        jam_level: JamLevel,
        points: Vec<GeoPoint>,
        active: bool,
    ) -> TrafficResult<Self> {
        if points.len() < 2 {
            return Err(TrafficError::TooFewPoints { segment: id, got: points.len() });
        }
        Ok(Self { id, name, jam_level, points, active })
    }
}

// ── CSV loading ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SegmentRecord {
    id: u32,
    name: String,
    jam_level: String,
    active: u8,
    geometry: String,
}

/// Load traffic segments from a CSV file.
pub fn load_segments_csv(path: &Path) -> TrafficResult<Vec<TrafficSegment>> {
    let file = std::fs::File::open(path)?;
    load_segments_reader(file)
}

/// Like [`load_segments_csv`] but accepts any `Read` source.
///
/// Useful for testing (pass a `std::io::Cursor`).
pub fn load_segments_reader<R: Read>(reader: R) -> TrafficResult<Vec<TrafficSegment>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut segments = Vec::new();

    for result in csv_reader.deserialize::<SegmentRecord>() {
        let row = result?;
        let jam_level = JamLevel::from_str(&row.jam_level).map_err(TrafficError::Parse)?;
        let points = polyline::decode(&row.geometry)?;
        let name = if row.name.is_empty() { None } else { Some(row.name) };
        segments.push(TrafficSegment::new(
            SegmentId(row.id),
            name,
            jam_level,
            points,
            row.active != 0,
        )?);
    }
    Ok(segments)
}

// ── TrafficIndex ──────────────────────────────────────────────────────────────

/// R-tree entry: one traffic segment's bounding box plus its index into the
/// owning `TrafficIndex`'s segment vector.
#[derive(Clone)]
struct SegmentEntry {
    bbox: AABB<[f64; 2]>, // [lat, lon]
    idx: usize,
}

impl RTreeObject for SegmentEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.bbox
    }
}

/// Read-only view over the *active* traffic segments with a bounding-box
/// index for corridor queries.
///
/// Built once from the current segment set; rebuild when operators change
/// the overlay (reference data churns on human timescales, not per request).
pub struct TrafficIndex {
    segments: Vec<TrafficSegment>,
    tree: RTree<SegmentEntry>,
}

impl TrafficIndex {
    /// Build from a segment list, keeping only active segments.
    pub fn build(segments: Vec<TrafficSegment>) -> Self {
        let segments: Vec<TrafficSegment> =
            segments.into_iter().filter(|s| s.active).collect();

        let entries: Vec<SegmentEntry> = segments
            .iter()
            .enumerate()
            .map(|(idx, s)| SegmentEntry { bbox: points_bbox(&s.points), idx })
            .collect();

        Self { segments, tree: RTree::bulk_load(entries) }
    }

    /// An index over no segments; every assessment comes back clean.
    pub fn empty() -> Self {
        Self::build(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// All active segments whose bounding box comes within `margin_m` metres
    /// of the box spanned by `a`–`b`.
    pub fn near_span(
        &self,
        a: GeoPoint,
        b: GeoPoint,
        margin_m: f64,
    ) -> impl Iterator<Item = &TrafficSegment> {
        let query = inflate(span_bbox(a, b), a.lat.max(b.lat), margin_m);
        self.tree
            .locate_in_envelope_intersecting(&query)
            .map(|e| &self.segments[e.idx])
    }
}

// ── Bounding-box helpers ──────────────────────────────────────────────────────

fn span_bbox(a: GeoPoint, b: GeoPoint) -> AABB<[f64; 2]> {
    AABB::from_corners(
        [a.lat.min(b.lat), a.lon.min(b.lon)],
        [a.lat.max(b.lat), a.lon.max(b.lon)],
    )
}

fn points_bbox(points: &[GeoPoint]) -> AABB<[f64; 2]> {
    let mut min = [f64::MAX, f64::MAX];
    let mut max = [f64::MIN, f64::MIN];
    for p in points {
        min[0] = min[0].min(p.lat);
        min[1] = min[1].min(p.lon);
        max[0] = max[0].max(p.lat);
        max[1] = max[1].max(p.lon);
    }
    AABB::from_corners(min, max)
}

/// Grow a box by `margin_m` metres on every side, converting to degrees at
/// the given latitude (longitude degrees shrink toward the poles).
fn inflate(bbox: AABB<[f64; 2]>, at_lat: f64, margin_m: f64) -> AABB<[f64; 2]> {
    let lat_deg = margin_m / 111_320.0;
    let lon_deg = lat_deg / at_lat.to_radians().cos().max(0.1);
    AABB::from_corners(
        [bbox.lower()[0] - lat_deg, bbox.lower()[1] - lon_deg],
        [bbox.upper()[0] + lat_deg, bbox.upper()[1] + lon_deg],
    )
}
