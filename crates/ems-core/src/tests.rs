//! Unit tests for ems-core primitives.

#[cfg(test)]
mod geo {
    use crate::geo::{self, GeoPoint};

    #[test]
    fn zero_distance() {
        let p = GeoPoint::new(40.4168, -3.7038);
        assert!(p.distance_m(p) < 0.01);
    }

    #[test]
    fn one_degree_of_latitude() {
        // ~1 degree of latitude ≈ 111 km
        let a = GeoPoint::new(40.0, -3.7);
        let b = GeoPoint::new(41.0, -3.7);
        let d = a.distance_m(b);
        assert!((d - 111_195.0).abs() < 500.0, "got {d}");
    }

    #[test]
    fn bearing_cardinal_directions() {
        let origin = GeoPoint::new(0.0, 0.0);
        let north = GeoPoint::new(1.0, 0.0);
        let east = GeoPoint::new(0.0, 1.0);
        assert!(origin.bearing_to(north).abs() < 1e-6);
        assert!((origin.bearing_to(east) - std::f64::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn offset_round_trip() {
        let p = GeoPoint::new(40.4168, -3.7038);
        let q = p.offset_m(std::f64::consts::FRAC_PI_2, 800.0);
        assert!((p.distance_m(q) - 800.0).abs() < 1.0);
    }

    #[test]
    fn lerp_endpoints_and_midpoint() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(1.0, 2.0);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        let mid = a.lerp(b, 0.5);
        assert!((mid.lat - 0.5).abs() < 1e-12);
        assert!((mid.lon - 1.0).abs() < 1e-12);
        // Out-of-range t clamps rather than extrapolating.
        assert_eq!(a.lerp(b, 1.5), b);
    }

    #[test]
    fn projection_onto_segment_interior() {
        // Horizontal segment on the equator, point 0.001° north of its middle.
        let s1 = GeoPoint::new(0.0, 0.0);
        let s2 = GeoPoint::new(0.0, 0.02);
        let p = GeoPoint::new(0.001, 0.01);

        let proj = geo::point_to_segment(p, s1, s2);
        assert!((proj.t - 0.5).abs() < 1e-6);
        // Perpendicular distance ≈ 0.001° of latitude ≈ 111 m.
        assert!((proj.distance_m - 111.2).abs() < 1.0, "got {}", proj.distance_m);
        // Halfway along a ~2.2 km segment.
        let half = s1.distance_m(s2) / 2.0;
        assert!((proj.along_m - half).abs() < 1.0);
    }

    #[test]
    fn projection_clamps_past_endpoint() {
        let s1 = GeoPoint::new(0.0, 0.0);
        let s2 = GeoPoint::new(0.0, 0.01);
        let p = GeoPoint::new(0.0, 0.05); // beyond s2
        let proj = geo::point_to_segment(p, s1, s2);
        assert_eq!(proj.t, 1.0);
        assert!((proj.along_m - s1.distance_m(s2)).abs() < 1e-6);
    }

    #[test]
    fn degenerate_segment_projects_to_start() {
        let s = GeoPoint::new(10.0, 10.0);
        let p = GeoPoint::new(10.001, 10.0);
        let proj = geo::point_to_segment(p, s, s);
        assert_eq!(proj.t, 0.0);
        assert!((proj.distance_m - p.distance_m(s)).abs() < 1e-9);
    }

    #[test]
    fn segment_to_segment_parallel() {
        // Two parallel segments 0.001° of latitude apart (~111 m).
        let d = geo::segment_to_segment(
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 0.01),
            GeoPoint::new(0.001, 0.0),
            GeoPoint::new(0.001, 0.01),
        );
        assert!((d - 111.2).abs() < 1.0, "got {d}");
    }

    #[test]
    fn path_length_sums_segments() {
        let pts = [
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 0.01),
            GeoPoint::new(0.0, 0.02),
        ];
        let len = geo::path_length_m(&pts);
        let direct = pts[0].distance_m(pts[2]);
        assert!((len - direct).abs() < 0.5, "collinear path: {len} vs {direct}");
    }

    #[test]
    fn resample_densifies_long_segments() {
        // ~2.2 km segment at 100 m steps → at least 20 intermediate points.
        let pts = [GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 0.02)];
        let dense = geo::resample(&pts, 100.0);
        assert!(dense.len() > 20, "got {}", dense.len());
        assert_eq!(dense[0], pts[0]);
        assert_eq!(*dense.last().unwrap(), pts[1]);
        // Consecutive samples never exceed the step by more than rounding.
        for w in dense.windows(2) {
            assert!(w[0].distance_m(w[1]) <= 101.0);
        }
    }

    #[test]
    fn resample_short_input_unchanged() {
        let pts = [GeoPoint::new(1.0, 1.0)];
        assert_eq!(geo::resample(&pts, 25.0), pts.to_vec());
    }
}

#[cfg(test)]
mod polyline {
    use crate::geo::GeoPoint;
    use crate::polyline::{self, MAX_WAYPOINTS};

    #[test]
    fn reference_vector() {
        // The canonical example from the polyline format documentation.
        let pts = [
            GeoPoint::new(38.5, -120.2),
            GeoPoint::new(40.7, -120.95),
            GeoPoint::new(43.252, -126.453),
        ];
        assert_eq!(polyline::encode(&pts), "_p~iF~ps|U_ulLnnqC_mqNvxq`@");
    }

    #[test]
    fn round_trip_quantises_to_1e5() {
        let pts = [
            GeoPoint::new(40.416775, -3.703790),
            GeoPoint::new(40.417891, -3.702134),
            GeoPoint::new(40.419203, -3.700001),
        ];
        let decoded = polyline::decode(&polyline::encode(&pts)).unwrap();
        assert_eq!(decoded.len(), pts.len());
        for (d, p) in decoded.iter().zip(pts.iter()) {
            assert!((d.lat - p.lat).abs() < 1e-5);
            assert!((d.lon - p.lon).abs() < 1e-5);
        }
    }

    #[test]
    fn empty_decodes_empty() {
        assert!(polyline::decode("").unwrap().is_empty());
    }

    #[test]
    fn truncated_input_rejected() {
        // A continuation bit with nothing after it.
        assert!(polyline::decode("_p~iF~ps|U_").is_err());
    }

    #[test]
    fn out_of_range_byte_rejected() {
        assert!(polyline::decode("_p~iF ~ps|U").is_err());
    }

    #[test]
    fn cap_waypoints_under_cap_unchanged() {
        let pts: Vec<GeoPoint> = (0..100)
            .map(|i| GeoPoint::new(i as f64 * 1e-4, 0.0))
            .collect();
        assert_eq!(polyline::cap_waypoints(&pts).len(), 100);
    }

    #[test]
    fn cap_waypoints_strides_down_to_cap() {
        let pts: Vec<GeoPoint> = (0..1000)
            .map(|i| GeoPoint::new(i as f64 * 1e-4, 0.0))
            .collect();
        let capped = polyline::cap_waypoints(&pts);
        assert_eq!(capped.len(), MAX_WAYPOINTS);
        assert_eq!(capped[0], pts[0]);
        // Samples stay in original order.
        for w in capped.windows(2) {
            assert!(w[0].lat < w[1].lat);
        }
    }
}

#[cfg(test)]
mod kinds {
    use std::str::FromStr;

    use crate::kinds::{IncidentStatus, JamLevel, LegStatus, ServiceKind, UnitStatus};

    #[test]
    fn string_round_trips() {
        assert_eq!(ServiceKind::from_str("AMBULANCE").unwrap(), ServiceKind::Ambulance);
        assert_eq!(UnitStatus::Dispatched.as_str(), "DISPATCHED");
        assert_eq!(IncidentStatus::from_str("ASSIGNED").unwrap(), IncidentStatus::Assigned);
        assert_eq!(JamLevel::from_str("HIGH").unwrap(), JamLevel::High);
        assert!(ServiceKind::from_str("HELICOPTER").is_err());
    }

    #[test]
    fn leg_status_thresholds() {
        assert_eq!(LegStatus::from_progress(0.0), LegStatus::Departed);
        assert_eq!(LegStatus::from_progress(0.2), LegStatus::Departed);
        assert_eq!(LegStatus::from_progress(0.21), LegStatus::Enroute);
        assert_eq!(LegStatus::from_progress(0.8), LegStatus::Enroute);
        assert_eq!(LegStatus::from_progress(0.81), LegStatus::Arriving);
        assert_eq!(LegStatus::from_progress(1.0), LegStatus::Arrived);
        assert_eq!(LegStatus::from_progress(1.3), LegStatus::Arrived);
    }

    #[test]
    fn serde_uses_wire_spelling() {
        let s = serde_json::to_string(&UnitStatus::Available).unwrap();
        assert_eq!(s, "\"AVAILABLE\"");
    }
}
