//! Encoded-polyline codec (Google polyline algorithm, precision 1e-5).
//!
//! This is the geometry format OSRM returns with `geometries=polyline` and
//! the format route records persist.  The codec is symmetric except for the
//! 1e-5 quantisation: `decode(encode(p))` reproduces each coordinate to
//! within 0.00001°, roughly one metre.

use crate::error::{CoreError, CoreResult};
use crate::geo::GeoPoint;

/// Hard cap on persisted waypoints per route.
///
/// Raw OSRM geometries for a cross-town route can carry thousands of points;
/// 245 is plenty for display and keeps row sizes bounded.
pub const MAX_WAYPOINTS: usize = 245;

/// Encode `points` as a polyline string.
pub fn encode(points: &[GeoPoint]) -> String {
    let mut out = String::with_capacity(points.len() * 6);
    let mut prev_lat = 0i64;
    let mut prev_lon = 0i64;

    for p in points {
        let lat = (p.lat * 1e5).round() as i64;
        let lon = (p.lon * 1e5).round() as i64;
        encode_value(lat - prev_lat, &mut out);
        encode_value(lon - prev_lon, &mut out);
        prev_lat = lat;
        prev_lon = lon;
    }
    out
}

/// Decode a polyline string into points.
///
/// # Errors
///
/// `CoreError::InvalidPolyline` on a truncated chunk sequence or a byte
/// outside the printable encoding range.
pub fn decode(encoded: &str) -> CoreResult<Vec<GeoPoint>> {
    let bytes = encoded.as_bytes();
    let mut points = Vec::with_capacity(bytes.len() / 4);
    let mut i = 0usize;
    let mut lat = 0i64;
    let mut lon = 0i64;

    while i < bytes.len() {
        lat += decode_value(bytes, &mut i)?;
        if i >= bytes.len() {
            return Err(CoreError::InvalidPolyline(
                "dangling latitude without longitude".into(),
            ));
        }
        lon += decode_value(bytes, &mut i)?;
        points.push(GeoPoint::new(lat as f64 / 1e5, lon as f64 / 1e5));
    }
    Ok(points)
}

/// Uniform stride-sample `points` down to at most [`MAX_WAYPOINTS`].
///
/// Inputs at or under the cap are returned unchanged.  The stride walk is the
/// same one the route cache has always used: `step = len / cap`, taking
/// `points[floor(i * step)]`.
pub fn cap_waypoints(points: &[GeoPoint]) -> Vec<GeoPoint> {
    if points.len() <= MAX_WAYPOINTS {
        return points.to_vec();
    }
    let step = points.len() as f64 / MAX_WAYPOINTS as f64;
    (0..MAX_WAYPOINTS)
        .map(|i| points[(i as f64 * step) as usize])
        .collect()
}

// ── Varint internals ──────────────────────────────────────────────────────────

fn encode_value(value: i64, out: &mut String) {
    // Zig-zag so small negative deltas stay short.
    let mut v = if value < 0 { !(value << 1) } else { value << 1 };
    while v >= 0x20 {
        out.push((((0x20 | (v & 0x1f)) + 63) as u8) as char);
        v >>= 5;
    }
    out.push(((v + 63) as u8) as char);
}

fn decode_value(bytes: &[u8], i: &mut usize) -> CoreResult<i64> {
    let mut result = 0i64;
    let mut shift = 0u32;

    loop {
        let Some(&b) = bytes.get(*i) else {
            return Err(CoreError::InvalidPolyline("truncated chunk".into()));
        };
        if b < 63 {
            return Err(CoreError::InvalidPolyline(format!(
                "byte {b} at offset {} below encoding range",
                *i
            )));
        }
        *i += 1;

        let chunk = (b - 63) as i64;
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk & 0x20 == 0 {
            break;
        }
        if shift > 60 {
            return Err(CoreError::InvalidPolyline("chunk overflow".into()));
        }
    }

    Ok(if result & 1 != 0 {
        !(result >> 1)
    } else {
        result >> 1
    })
}
