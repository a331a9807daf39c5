//! `ems-dispatch` — the orchestration layer of the dispatch core.
//!
//! Everything below this crate is a mechanism; this crate owns the control
//! flow the outer API layer triggers:
//!
//! ```text
//! dispatch(incident) ──► nearest unit ──► candidate routes ──► traffic-aware
//!     selection ──► store.assign (transaction) ──► broadcast
//! complete(incident) ──► store.complete ──► tracking cleanup ──► broadcast
//! report_position(unit, fix) ──► store + tracker + registry ──► broadcast
//! ```
//!
//! [`StoreAssignmentFeed`] closes the loop for the movement simulator, which
//! animates assigned units between real GPS fixes.

pub mod dispatcher;
pub mod error;
pub mod feed;

#[cfg(test)]
mod tests;

pub use dispatcher::{CompletionOutcome, DispatchOutcome, Dispatcher, GpsReport};
pub use error::{DispatchError, DispatchResult};
pub use feed::StoreAssignmentFeed;
