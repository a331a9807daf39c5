//! Strongly typed identifier wrappers.
//!
//! All IDs are `Copy + Ord + Hash` so they can be used as map keys and sorted
//! collection elements without ceremony.  `UnitId`, `IncidentId`, and
//! `SegmentId` mirror the integer primary keys of their store tables;
//! `RouteId` is an `i64` because it carries a SQLite rowid.

use std::fmt;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[derive(serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        $vis struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<$inner> for $name {
            #[inline(always)]
            fn from(raw: $inner) -> Self {
                Self(raw)
            }
        }
    };
}

typed_id! {
    /// A dispatchable emergency vehicle.
    pub struct UnitId(u32);
}

typed_id! {
    /// A reported emergency requiring a unit assignment.
    pub struct IncidentId(u32);
}

typed_id! {
    /// A persisted route record (SQLite rowid).
    pub struct RouteId(i64);
}

typed_id! {
    /// An operator-drawn traffic segment.
    pub struct SegmentId(u32);
}
