//! Line and identifier/name pairs.

use std::fmt;
use std::hash::{Hash, Hasher};

/// A server-assigned identifier together with its display name.
///
/// Used for both lines and directions. Equality and hashing consider only
/// the identifier: the upstream occasionally re-labels entries, and two
/// `IdName`s with the same id refer to the same thing regardless.
#[derive(Debug, Clone)]
pub struct IdName {
    pub id: String,
    pub name: String,
}

impl IdName {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl PartialEq for IdName {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for IdName {}

impl Hash for IdName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for IdName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A bus line, heading in one particular direction.
///
/// A line is identified by `details.id`; a line *variant* (the thing a stop
/// belongs to) is identified by the `(details.id, direction.id)` pair, which
/// is what equality compares. The display color does not participate in
/// identity.
#[derive(Debug, Clone)]
pub struct Line {
    /// Line identifier and display name.
    pub details: IdName,
    /// Direction identifier (e.g. `"A"`/`"R"`) and destination label.
    pub direction: IdName,
    /// Display color, `#RRGGBB`.
    pub color: String,
}

impl Line {
    pub fn new(details: IdName, direction: IdName, color: impl Into<String>) -> Self {
        Self {
            details,
            direction,
            color: color.into(),
        }
    }
}

impl PartialEq for Line {
    fn eq(&self, other: &Self) -> bool {
        self.details == other.details && self.direction == other.direction
    }
}

impl Eq for Line {}

impl Hash for Line {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.details.hash(state);
        self.direction.hash(state);
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.details.name, self.direction.name)
    }
}
