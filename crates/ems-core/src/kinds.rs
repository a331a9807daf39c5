//! Shared enums: service capabilities, lifecycle statuses, jam levels.
//!
//! All variants serialize as the SCREAMING_SNAKE strings the store persists
//! and the broadcast events carry, so a round trip through either never
//! invents a new spelling.

use std::fmt;
use std::str::FromStr;

/// Capability type of a unit, matched against the incident type at dispatch.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceKind {
    Ambulance,
    Fire,
    Police,
}

/// Unit lifecycle.  A unit has at most one active assignment at a time;
/// `Dispatched` is only entered through the dispatcher and only left through
/// incident completion.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitStatus {
    Available,
    Dispatched,
    OutOfService,
}

/// Incident lifecycle.  `Assigned → Completed` transitions happen only
/// through the dispatch core; intake owns `Pending`/`Approved`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentStatus {
    Pending,
    Approved,
    Assigned,
    Completed,
    Cancelled,
}

/// Operator-assigned congestion level of a traffic segment.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JamLevel {
    Low,
    Medium,
    High,
}

/// Display label for a unit's progress along its assigned route.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LegStatus {
    Departed,
    Enroute,
    Arriving,
    Arrived,
}

impl LegStatus {
    /// Label for a progress fraction.  Boundaries resolve downward: 0.2 is
    /// still `Departed`, 0.8 still `Enroute`.
    pub fn from_progress(progress: f64) -> LegStatus {
        if progress >= 1.0 {
            LegStatus::Arrived
        } else if progress > 0.8 {
            LegStatus::Arriving
        } else if progress > 0.2 {
            LegStatus::Enroute
        } else {
            LegStatus::Departed
        }
    }
}

// ── String round trips (store persistence) ────────────────────────────────────

macro_rules! str_repr {
    ($ty:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($ty::$variant => $s),+
                }
            }
        }

        impl FromStr for $ty {
            type Err = String;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok($ty::$variant),)+
                    other => Err(format!(concat!("unknown ", stringify!($ty), " {:?}"), other)),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_repr!(ServiceKind {
    Ambulance => "AMBULANCE",
    Fire      => "FIRE",
    Police    => "POLICE",
});

str_repr!(UnitStatus {
    Available    => "AVAILABLE",
    Dispatched   => "DISPATCHED",
    OutOfService => "OUT_OF_SERVICE",
});

str_repr!(IncidentStatus {
    Pending   => "PENDING",
    Approved  => "APPROVED",
    Assigned  => "ASSIGNED",
    Completed => "COMPLETED",
    Cancelled => "CANCELLED",
});

str_repr!(JamLevel {
    Low    => "LOW",
    Medium => "MEDIUM",
    High   => "HIGH",
});

str_repr!(LegStatus {
    Departed => "DEPARTED",
    Enroute  => "ENROUTE",
    Arriving => "ARRIVING",
    Arrived  => "ARRIVED",
});
