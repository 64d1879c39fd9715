// lifecycle.rs — Typo lifecycle engine.
//
// A typo moves through four statuses. Callers request a move by supplying
// an event; the engine looks the (status, event) pair up in TRANSITIONS:
//
//   REPORTED    --START-->   IN_PROGRESS
//   IN_PROGRESS --RESOLVE--> RESOLVED
//   CANCELED    --RESTART--> IN_PROGRESS
//
// No event means "tell me where I am": the status comes back unchanged.
// Any pair without a row is rejected, and the caller keeps the old status.
// The engine never guesses an event and never touches storage.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a reported typo.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypoStatus {
    /// Freshly reported, nobody has picked it up yet.
    Reported,
    /// A workspace member is fixing it.
    InProgress,
    /// Fixed on the tracked site.
    Resolved,
    /// Dismissed. Can be restarted.
    Canceled,
}

impl TypoStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [TypoStatus; 4] = [
        TypoStatus::Reported,
        TypoStatus::InProgress,
        TypoStatus::Resolved,
        TypoStatus::Canceled,
    ];

    /// Stable upper-case name, used for display and as the stored column value.
    pub fn as_str(self) -> &'static str {
        match self {
            TypoStatus::Reported => "REPORTED",
            TypoStatus::InProgress => "IN_PROGRESS",
            TypoStatus::Resolved => "RESOLVED",
            TypoStatus::Canceled => "CANCELED",
        }
    }

    /// Events that have a row for this status in the transition table.
    pub fn available_events(self) -> Vec<TypoEvent> {
        TRANSITIONS
            .iter()
            .filter(|(from, _, _)| *from == self)
            .map(|(_, event, _)| *event)
            .collect()
    }
}

impl fmt::Display for TypoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypoStatus {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "REPORTED" => Ok(TypoStatus::Reported),
            "IN_PROGRESS" => Ok(TypoStatus::InProgress),
            "RESOLVED" => Ok(TypoStatus::Resolved),
            "CANCELED" | "CANCELLED" => Ok(TypoStatus::Canceled),
            _ => Err(UnknownName {
                kind: "typo status",
                name: s.to_string(),
            }),
        }
    }
}

/// A caller-supplied request to move a typo along its lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypoEvent {
    Start,
    Restart,
    Resolve,
}

impl TypoEvent {
    pub const ALL: [TypoEvent; 3] = [TypoEvent::Start, TypoEvent::Restart, TypoEvent::Resolve];

    pub fn as_str(self) -> &'static str {
        match self {
            TypoEvent::Start => "START",
            TypoEvent::Restart => "RESTART",
            TypoEvent::Resolve => "RESOLVE",
        }
    }
}

impl fmt::Display for TypoEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypoEvent {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "START" => Ok(TypoEvent::Start),
            "RESTART" => Ok(TypoEvent::Restart),
            "RESOLVE" => Ok(TypoEvent::Resolve),
            _ => Err(UnknownName {
                kind: "typo event",
                name: s.to_string(),
            }),
        }
    }
}

/// Returned when parsing a status or event name that is not in the closed set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{name}'")]
pub struct UnknownName {
    pub kind: &'static str,
    pub name: String,
}

fn normalize(s: &str) -> String {
    s.trim().to_ascii_uppercase().replace(['-', ' '], "_")
}

/// The complete transition table. Pairs not listed here are rejected.
pub const TRANSITIONS: &[(TypoStatus, TypoEvent, TypoStatus)] = &[
    (TypoStatus::Reported, TypoEvent::Start, TypoStatus::InProgress),
    (TypoStatus::InProgress, TypoEvent::Resolve, TypoStatus::Resolved),
    (TypoStatus::Canceled, TypoEvent::Restart, TypoStatus::InProgress),
];

/// Outcome of asking the engine for the next status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The event matched a row; the typo moves to `to`.
    Applied { from: TypoStatus, to: TypoStatus },
    /// No event was given; nothing to do.
    Unchanged(TypoStatus),
    /// The event has no row for this status. The typo stays where it is.
    Rejected {
        status: TypoStatus,
        event: TypoEvent,
    },
}

impl Transition {
    /// The status the typo should have after this outcome.
    pub fn status(self) -> TypoStatus {
        match self {
            Transition::Applied { to, .. } => to,
            Transition::Unchanged(status) => status,
            Transition::Rejected { status, .. } => status,
        }
    }

    /// `false` only for rejected events.
    pub fn is_ok(self) -> bool {
        !matches!(self, Transition::Rejected { .. })
    }

    /// `true` when the status actually changes and has to be written.
    pub fn changes_status(self) -> bool {
        matches!(self, Transition::Applied { from, to } if from != to)
    }
}

/// Compute the next status for `current` given an optional `event`.
pub fn next_status(current: TypoStatus, event: Option<TypoEvent>) -> Transition {
    let Some(event) = event else {
        return Transition::Unchanged(current);
    };

    TRANSITIONS
        .iter()
        .find(|(from, ev, _)| *from == current && *ev == event)
        .map(|(from, _, to)| Transition::Applied {
            from: *from,
            to: *to,
        })
        .unwrap_or(Transition::Rejected {
            status: current,
            event,
        })
}
