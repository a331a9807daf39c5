//! `ems-routing` — unit selection and traffic-aware route selection.
//!
//! The dispatch control flow runs through this crate in two deliberate
//! passes.  First [`nearest_unit`] picks the closest eligible unit using
//! cheap distance-only provider probes; only then does the
//! [`CandidateGenerator`] / [`RouteSelector`] pair spend full-geometry calls
//! on that single unit.  Coupling the passes (scoring full routes for every
//! unit in the pool) would multiply provider latency by pool size on the
//! hottest path in the system.
//!
//! | Module        | Contents                                              |
//! |---------------|-------------------------------------------------------|
//! | [`provider`]  | `Route`, `RouteSummary`, `RouteProvider` trait        |
//! | [`osrm`]      | Primary provider client (OSRM HTTP API)               |
//! | [`ors`]       | Optional secondary provider (openrouteservice)        |
//! | [`candidates`]| Alternatives + perpendicular via-point probes         |
//! | [`selector`]  | Cost ranking, rescue pass, geometry-less fallback     |
//! | [`nearest`]   | Nearest eligible unit within the 50 km cap            |
//! | [`error`]     | `RoutingError`, `RoutingResult<T>`                    |
//!
//! Every provider call carries a short timeout and every failure is a
//! visible fallback branch, never a user-facing error.

pub mod candidates;
pub mod error;
pub mod nearest;
pub mod ors;
pub mod osrm;
pub mod provider;
pub mod selector;

#[cfg(test)]
mod tests;

pub use candidates::{CandidateGenerator, MAX_CANDIDATES};
pub use error::{RoutingError, RoutingResult};
pub use nearest::{MAX_DISPATCH_DISTANCE_M, NearestUnit, UnitCandidate, nearest_unit};
pub use ors::OrsProvider;
pub use osrm::OsrmProvider;
pub use provider::{Route, RouteProvider, RouteSummary};
pub use selector::{RouteSelector, RoutingSource, SelectedRoute};
