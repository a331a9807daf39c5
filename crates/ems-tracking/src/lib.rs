//! `ems-tracking` — live unit tracking: progress, registry, broadcast,
//! simulated movement.
//!
//! | Module        | Contents                                               |
//! |---------------|--------------------------------------------------------|
//! | [`tracker`]   | `ProgressTracker` — fresh ramp / GPS / time fallback   |
//! | [`registry`]  | `LiveLocationRegistry` — shared latest-fix map + history |
//! | [`broadcast`] | `TrackingEvent`, `Broadcaster` seam                    |
//! | [`simulator`] | `MovementSimulator` worker thread + `SimulatorHandle`  |
//! | [`error`]     | `TrackingError`, `TrackingResult<T>`                   |
//!
//! Nothing here touches the database or the network directly: the simulator
//! pulls its work through the [`AssignmentFeed`] trait and publishes through
//! [`Broadcaster`], so the whole crate runs under test with in-memory
//! doubles.

pub mod broadcast;
pub mod error;
pub mod registry;
pub mod simulator;
pub mod tracker;


pub use broadcast::{Broadcaster, NullBroadcaster, TrackingEvent};
pub use error::{TrackingError, TrackingResult};
pub use registry::{HISTORY_LIMIT, LiveLocation, LiveLocationRegistry, LocationSource};
pub use simulator::{
    AssignmentFeed, MovementSimulator, SimAssignment, SimulatorHandle, TICK_INTERVAL,
    TICK_PROGRESS_STEP,
};
pub use tracker::ProgressTracker;
