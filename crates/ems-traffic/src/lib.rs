//! `ems-traffic` — operator-drawn traffic segments and route classification.
//!
//! Traffic segments are reference data: polylines tagged with a jam level,
//! maintained outside the dispatch core and read-only here.  This crate
//! answers one question about a candidate route: *how badly does it overlap
//! the current congestion picture?*  The answer comes back as a
//! [`TrafficAssessment`] — hard-block flag, time penalty, severity rank, and
//! a normalized congestion score — which the route selector turns into a
//! ranking.
//!
//! | Module      | Contents                                             |
//! |-------------|------------------------------------------------------|
//! | [`segment`] | `TrafficSegment`, `TrafficIndex`, CSV loader         |
//! | [`overlay`] | `TrafficOverlay::assess`, thresholds, penalty rates  |
//! | [`error`]   | `TrafficError`, `TrafficResult<T>`                   |

pub mod error;
pub mod overlay;
pub mod segment;


pub use error::{TrafficError, TrafficResult};
pub use overlay::{TrafficAssessment, TrafficOverlay};
pub use segment::{TrafficIndex, TrafficSegment, load_segments_csv, load_segments_reader};
