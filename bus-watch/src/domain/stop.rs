//! Saved bus stops.

use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::NaiveDateTime;

use super::Line;

/// A bus stop saved by the user.
///
/// `id` is the stable local key (the persisted store's primary key) and
/// never changes. `reference` is the opaque key the upstream wants in
/// schedule queries; the server reassigns references periodically, which is
/// what the reconciler repairs. Two stops are the same entity iff their ids
/// match: equality deliberately ignores reference drift.
#[derive(Debug, Clone)]
pub struct Stop {
    /// Stable local identifier (the upstream stop code at creation time).
    pub id: i32,
    /// Server-assigned schedule-query key. Goes stale; see `is_outdated`.
    pub reference: String,
    /// Normalized display name.
    pub name: String,
    /// The line variant this stop belongs to.
    pub line: Line,
    /// Whether the user asked to be notified when a bus nears this stop.
    pub is_watched: bool,
    /// Last arrival estimate recorded by the decision engine.
    pub last_eta: Option<NaiveDateTime>,
    /// Set when a schedule refresh suggests `reference` no longer resolves.
    pub is_outdated: bool,
}

impl Stop {
    pub fn new(id: i32, name: impl Into<String>, reference: impl Into<String>, line: Line) -> Self {
        Self {
            id,
            reference: reference.into(),
            name: name.into(),
            line,
            is_watched: false,
            last_eta: None,
            is_outdated: false,
        }
    }
}

impl PartialEq for Stop {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Stop {}

impl Hash for Stop {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Stop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IdName;

    fn line() -> Line {
        Line::new(
            IdName::new("21", "Ligne 21"),
            IdName::new("A", "Caen Nord"),
            "#9c0643",
        )
    }

    #[test]
    fn identity_survives_reference_drift() {
        let saved = Stop::new(3000, "Porte de Paris", "596", line());
        let mut refreshed = saved.clone();
        refreshed.reference = "851".into();
        assert_eq!(saved, refreshed);
    }

    #[test]
    fn different_ids_are_different_stops() {
        let a = Stop::new(3000, "Porte de Paris", "596", line());
        let b = Stop::new(3001, "Porte de Paris", "596", line());
        assert_ne!(a, b);
    }
}
