//! Route-vs-traffic classification.
//!
//! Two independent tests run over every candidate route:
//!
//! 1. **Hard block** — any route segment within [`BLOCKED_SEGMENT_M`] of a
//!    HIGH-jam polyline, or any densely re-sampled route point within
//!    [`BLOCKED_SAMPLE_M`] of one, rejects the candidate outright.  The
//!    sample pass exists because a short, sharp deviation toward a jam can
//!    slip between the endpoints of a long route segment.  LOW and MEDIUM
//!    segments never block; they only accrue penalty.
//! 2. **Penalty scoring** — per route segment, the nearest traffic segment
//!    within [`PROXIMITY_M`] contributes `segment_length × rate(jam_level)`
//!    seconds of penalty and accumulates per-level overlap metres.
//!
//! A route that touches no traffic segment at all ranks 1 and scores the
//! LOW-weight congestion default: absence of data is treated as LOW.

use ems_core::{GeoPoint, JamLevel, geo};

use crate::segment::TrafficIndex;

// ── Thresholds ────────────────────────────────────────────────────────────────

/// Segment-to-segment distance to a HIGH-jam polyline at or under which a
/// candidate is hard-blocked.
pub const BLOCKED_SEGMENT_M: f64 = 90.0;

/// Re-sampled route point distance to a HIGH-jam polyline at or under which
/// a candidate is hard-blocked.
pub const BLOCKED_SAMPLE_M: f64 = 100.0;

/// Re-sampling step for the dense block check.
pub const SAMPLE_STEP_M: f64 = 25.0;

/// Proximity at or under which a route segment accrues penalty.
pub const PROXIMITY_M: f64 = 75.0;

/// Overlap length at which a jam level dominates the severity rank.
pub const RANK_OVERLAP_M: f64 = 120.0;

/// Congestion score used when a route overlaps nothing.
pub const BASELINE_CONGESTION: f64 = 0.2;

/// Penalty in seconds per metre of overlap at each jam level.
fn penalty_rate(level: JamLevel) -> f64 {
    match level {
        JamLevel::Low => 0.06,
        JamLevel::Medium => 0.16,
        JamLevel::High => 0.35,
    }
}

/// Weight of each jam level in the normalized congestion score.
fn congestion_weight(level: JamLevel) -> f64 {
    match level {
        JamLevel::Low => 0.2,
        JamLevel::Medium => 0.6,
        JamLevel::High => 1.0,
    }
}

// ── TrafficAssessment ─────────────────────────────────────────────────────────

/// Everything the route selector needs to know about one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficAssessment {
    /// Candidate must never be chosen while an unblocked alternative exists.
    pub blocked: bool,
    /// Accumulated time penalty in seconds (uncapped; the selector caps it).
    pub penalty_s: f64,
    /// Discrete severity class: 1 (clean) … 3 (heavy HIGH overlap).
    pub rank: u8,
    /// Normalized weighted overlap in `[0, 1]`, [`BASELINE_CONGESTION`] when
    /// the route overlaps nothing.
    pub congestion: f64,
    /// Overlap metres per jam level, indexed LOW/MEDIUM/HIGH.
    pub overlap_m: [f64; 3],
    /// Route segments that found a traffic segment within [`PROXIMITY_M`].
    pub hits: usize,
}

impl TrafficAssessment {
    /// Assessment for a route that overlaps nothing (also what an empty
    /// index produces).
    pub fn clean() -> Self {
        Self {
            blocked: false,
            penalty_s: 0.0,
            rank: 1,
            congestion: BASELINE_CONGESTION,
            overlap_m: [0.0; 3],
            hits: 0,
        }
    }
}

// ── TrafficOverlay ────────────────────────────────────────────────────────────

/// Classifies candidate routes against a [`TrafficIndex`].
pub struct TrafficOverlay<'a> {
    index: &'a TrafficIndex,
}

impl<'a> TrafficOverlay<'a> {
    pub fn new(index: &'a TrafficIndex) -> Self {
        Self { index }
    }

    /// Classify one candidate route (ordered points, source to destination).
    ///
    /// Routes with fewer than 2 points cannot intersect anything and come
    /// back [`TrafficAssessment::clean`].
    pub fn assess(&self, route: &[GeoPoint]) -> TrafficAssessment {
        if route.len() < 2 || self.index.is_empty() {
            return TrafficAssessment::clean();
        }

        let mut blocked = false;
        let mut penalty_s = 0.0;
        let mut overlap_m = [0.0f64; 3];
        let mut hits = 0usize;

        // ── Per-route-segment pass: block test + penalty accrual ──────────
        for w in route.windows(2) {
            let (a, b) = (w[0], w[1]);
            let seg_len = a.distance_m(b);

            // Nearest traffic segment within the penalty threshold; only the
            // nearest one charges this route segment (no double counting
            // where two jams overlap).
            let mut nearest: Option<(f64, JamLevel)> = None;

            for traffic in self.index.near_span(a, b, BLOCKED_SEGMENT_M.max(PROXIMITY_M)) {
                for tw in traffic.points.windows(2) {
                    let d = geo::segment_to_segment(a, b, tw[0], tw[1]);
                    if traffic.jam_level == JamLevel::High && d <= BLOCKED_SEGMENT_M {
                        blocked = true;
                    }
                    if d <= PROXIMITY_M
                        && nearest.is_none_or(|(best, _)| d < best)
                    {
                        nearest = Some((d, traffic.jam_level));
                    }
                }
            }

            if let Some((_, level)) = nearest {
                penalty_s += seg_len * penalty_rate(level);
                overlap_m[level as usize] += seg_len;
                hits += 1;
            }
        }

        // ── Dense sample pass: catch deviations between segment endpoints ──
        if !blocked {
            blocked = self.sampled_point_blocked(route);
        }

        // ── Severity rank ─────────────────────────────────────────────────
        let rank = if overlap_m[JamLevel::High as usize] >= RANK_OVERLAP_M {
            3
        } else if overlap_m[JamLevel::Medium as usize] >= RANK_OVERLAP_M {
            2
        } else {
            1
        };

        // ── Congestion score ──────────────────────────────────────────────
        let total: f64 = overlap_m.iter().sum();
        let congestion = if total > 0.0 {
            (congestion_weight(JamLevel::Low) * overlap_m[0]
                + congestion_weight(JamLevel::Medium) * overlap_m[1]
                + congestion_weight(JamLevel::High) * overlap_m[2])
                / total
        } else {
            BASELINE_CONGESTION
        };

        TrafficAssessment { blocked, penalty_s, rank, congestion, overlap_m, hits }
    }

    /// `true` if any densely re-sampled route point lies within
    /// [`BLOCKED_SAMPLE_M`] of a HIGH-jam polyline.
    fn sampled_point_blocked(&self, route: &[GeoPoint]) -> bool {
        let dense = geo::resample(route, SAMPLE_STEP_M);
        for p in &dense {
            for traffic in self.index.near_span(*p, *p, BLOCKED_SAMPLE_M) {
                if traffic.jam_level != JamLevel::High {
                    continue;
                }
                for tw in traffic.points.windows(2) {
                    if geo::point_to_segment(*p, tw[0], tw[1]).distance_m <= BLOCKED_SAMPLE_M {
                        return true;
                    }
                }
            }
        }
        false
    }
}
