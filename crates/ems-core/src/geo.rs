//! Geographic coordinate type and segment geometry.
//!
//! `GeoPoint` uses `f64` latitude/longitude.  The traffic overlay works with
//! thresholds in the tens of metres, and progress computation accumulates
//! distance over a few hundred segments; double precision keeps both paths
//! free of rounding concerns at negligible cost for the point counts involved
//! (routes are capped at 245 waypoints).
//!
//! Projection math (`point_to_segment`, `segment_to_segment`) runs in a local
//! equirectangular frame: longitudes are scaled by `cos(mid_lat)` so degree
//! offsets are isotropic, then actual distances are measured with haversine.
//! Exact geodesic projection is not needed at city scale.

/// A WGS-84 geographic coordinate.
#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// Mean Earth radius in metres.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

impl GeoPoint {
    #[inline]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Haversine great-circle distance in metres.
    pub fn distance_m(self, other: GeoPoint) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lon = (other.lon - self.lon).to_radians();

        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();

        let a = (d_lat * 0.5).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lon * 0.5).sin().powi(2);

        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_M * c
    }

    /// Initial bearing from `self` toward `other`, in radians from north.
    pub fn bearing_to(self, other: GeoPoint) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let d_lon = (other.lon - self.lon).to_radians();

        let y = d_lon.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();
        y.atan2(x)
    }

    /// Destination point `distance_m` metres from `self` along `bearing_rad`.
    ///
    /// Great-circle forward solution; used to manufacture via-point probes
    /// perpendicular to a route corridor.
    pub fn offset_m(self, bearing_rad: f64, distance_m: f64) -> GeoPoint {
        let ang = distance_m / EARTH_RADIUS_M;
        let lat1 = self.lat.to_radians();
        let lon1 = self.lon.to_radians();

        let lat2 = (lat1.sin() * ang.cos()
            + lat1.cos() * ang.sin() * bearing_rad.cos())
        .asin();
        let lon2 = lon1
            + (bearing_rad.sin() * ang.sin() * lat1.cos())
                .atan2(ang.cos() - lat1.sin() * lat2.sin());

        GeoPoint::new(lat2.to_degrees(), lon2.to_degrees())
    }

    /// Linear interpolation between `self` and `other` in coordinate space.
    ///
    /// `t` is clamped to `[0, 1]`.  Used by the movement simulator to render
    /// a synthetic position between a route's start and end.
    pub fn lerp(self, other: GeoPoint, t: f64) -> GeoPoint {
        let t = t.clamp(0.0, 1.0);
        GeoPoint::new(
            self.lat + (other.lat - self.lat) * t,
            self.lon + (other.lon - self.lon) * t,
        )
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

// ── Segment projection ────────────────────────────────────────────────────────

/// Result of projecting a point onto a segment.
#[derive(Copy, Clone, Debug)]
pub struct SegmentProjection {
    /// Haversine distance from the point to the closest point on the segment.
    pub distance_m: f64,
    /// The closest point on the segment.
    pub closest: GeoPoint,
    /// Distance from the segment start to the projection, along the segment.
    pub along_m: f64,
    /// Projection parameter, clamped to `[0, 1]`.
    pub t: f64,
}

/// Project `p` onto the segment `s1 → s2`.
///
/// `along_m` is what the progress tracker accumulates to turn a GPS fix into
/// "distance travelled along the route".
pub fn point_to_segment(p: GeoPoint, s1: GeoPoint, s2: GeoPoint) -> SegmentProjection {
    // Local equirectangular frame centred on the segment.
    let lon_scale = ((s1.lat + s2.lat) * 0.5).to_radians().cos();

    let dx = (s2.lon - s1.lon) * lon_scale;
    let dy = s2.lat - s1.lat;

    let fx = (p.lon - s1.lon) * lon_scale;
    let fy = p.lat - s1.lat;

    let len_sq = dx * dx + dy * dy;
    let t = if len_sq > 0.0 {
        ((fx * dx + fy * dy) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let closest = GeoPoint::new(s1.lat + t * dy, s1.lon + t * (s2.lon - s1.lon));

    SegmentProjection {
        distance_m: p.distance_m(closest),
        closest,
        along_m: t * s1.distance_m(s2),
        t,
    }
}

/// Minimum distance between two segments, approximated as the minimum over
/// the four endpoint-to-segment projections.
///
/// Not the exact convex-hull distance, but the error is bounded by segment
/// curvature and the traffic thresholds are tens of metres — acceptable.
pub fn segment_to_segment(a1: GeoPoint, a2: GeoPoint, b1: GeoPoint, b2: GeoPoint) -> f64 {
    let d1 = point_to_segment(a1, b1, b2).distance_m;
    let d2 = point_to_segment(a2, b1, b2).distance_m;
    let d3 = point_to_segment(b1, a1, a2).distance_m;
    let d4 = point_to_segment(b2, a1, a2).distance_m;
    d1.min(d2).min(d3).min(d4)
}

// ── Polyline helpers ──────────────────────────────────────────────────────────

/// Total haversine length of a polyline in metres.
pub fn path_length_m(points: &[GeoPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| w[0].distance_m(w[1]))
        .sum()
}

/// Re-sample `points` at a fixed `step_m` so that short, sharp deviations
/// near a traffic segment are not missed by coarse segment checks.
///
/// Original vertices are always kept; intermediate points are inserted every
/// `step_m` metres along each segment.  Inputs with fewer than 2 points are
/// returned unchanged.
pub fn resample(points: &[GeoPoint], step_m: f64) -> Vec<GeoPoint> {
    if points.len() < 2 || step_m <= 0.0 {
        return points.to_vec();
    }

    let mut out = Vec::with_capacity(points.len() * 2);
    for w in points.windows(2) {
        let (a, b) = (w[0], w[1]);
        out.push(a);
        let seg_len = a.distance_m(b);
        if seg_len > step_m {
            let n = (seg_len / step_m).floor() as usize;
            for i in 1..=n {
                let t = i as f64 * step_m / seg_len;
                if t < 1.0 {
                    out.push(a.lerp(b, t));
                }
            }
        }
    }
    out.push(points[points.len() - 1]);
    out
}
