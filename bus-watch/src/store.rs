//! Persisted stop store.
//!
//! The actual storage engine lives with the embedding application; this
//! crate only depends on the contract below. `MemoryStopStore` is a
//! reference implementation backing the tests and the console harness. Per
//! the concurrency contract, implementations must serialize mutations of a
//! given stop; the memory store takes one lock around everything.

use std::sync::Mutex;

use chrono::NaiveDateTime;

use crate::domain::Stop;

/// Errors from the persisted store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A stop with the same key is already saved.
    #[error("stop is already saved")]
    Duplicate,

    /// The stop is missing a field the store requires.
    #[error("incomplete stop: missing {0}")]
    InvalidArgument(&'static str),

    /// The backing store could not be reached or is corrupt.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Contract the persisted store must honor.
///
/// Stops are value objects: callers get copies and the store is the single
/// source of truth, re-read after each mutation. Lookups key on `Stop::id`.
pub trait StopStore: Send + Sync {
    /// Every saved stop, in stable user-visible order.
    fn all_stops(&self) -> Result<Vec<Stop>, StoreError>;

    /// The stops the user wants arrival notifications for.
    fn watched_stops(&self) -> Result<Vec<Stop>, StoreError>;

    /// Save a new stop. Fails with [`StoreError::Duplicate`] when the key
    /// is taken and [`StoreError::InvalidArgument`] when the stop is
    /// incomplete.
    fn add_stop(&self, stop: &Stop) -> Result<(), StoreError>;

    /// Remove a saved stop. Removing an unknown stop is a no-op.
    fn delete_stop(&self, stop: &Stop) -> Result<(), StoreError>;

    /// Overwrite the saved reference (and outdatedness) for the stop with
    /// this id. Returns whether a saved stop was actually updated.
    fn update_stop_reference(&self, stop: &Stop) -> Result<bool, StoreError>;

    /// Flip the watched flag. Either transition resets the recorded ETA so
    /// a new watch starts a fresh tracking cycle.
    fn set_watched(&self, stop: &Stop, watched: bool) -> Result<(), StoreError>;

    /// Record the latest observed ETA for a watched stop.
    fn update_watched_eta(&self, stop: &Stop, eta: NaiveDateTime) -> Result<(), StoreError>;

    /// Number of currently watched stops.
    fn watched_stop_count(&self) -> Result<usize, StoreError>;
}

/// In-memory store, insertion-ordered.
#[derive(Debug, Default)]
pub struct MemoryStopStore {
    stops: Mutex<Vec<Stop>>,
}

impl MemoryStopStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked<T>(&self, f: impl FnOnce(&mut Vec<Stop>) -> T) -> Result<T, StoreError> {
        let mut guard = self
            .stops
            .lock()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(f(&mut guard))
    }
}

impl StopStore for MemoryStopStore {
    fn all_stops(&self) -> Result<Vec<Stop>, StoreError> {
        self.locked(|stops| stops.clone())
    }

    fn watched_stops(&self) -> Result<Vec<Stop>, StoreError> {
        self.locked(|stops| stops.iter().filter(|s| s.is_watched).cloned().collect())
    }

    fn add_stop(&self, stop: &Stop) -> Result<(), StoreError> {
        validate(stop)?;

        self.locked(|stops| {
            if stops.iter().any(|s| s.id == stop.id) {
                return Err(StoreError::Duplicate);
            }
            stops.push(stop.clone());
            Ok(())
        })?
    }

    fn delete_stop(&self, stop: &Stop) -> Result<(), StoreError> {
        self.locked(|stops| stops.retain(|s| s.id != stop.id))
    }

    fn update_stop_reference(&self, stop: &Stop) -> Result<bool, StoreError> {
        self.locked(|stops| {
            let Some(saved) = stops.iter_mut().find(|s| s.id == stop.id) else {
                return false;
            };
            saved.reference = stop.reference.clone();
            saved.is_outdated = stop.is_outdated;
            true
        })
    }

    fn set_watched(&self, stop: &Stop, watched: bool) -> Result<(), StoreError> {
        self.locked(|stops| {
            if let Some(saved) = stops.iter_mut().find(|s| s.id == stop.id) {
                saved.is_watched = watched;
                saved.last_eta = None;
            }
        })
    }

    fn update_watched_eta(&self, stop: &Stop, eta: NaiveDateTime) -> Result<(), StoreError> {
        self.locked(|stops| {
            if let Some(saved) = stops.iter_mut().find(|s| s.id == stop.id) {
                saved.last_eta = Some(eta);
            }
        })
    }

    fn watched_stop_count(&self) -> Result<usize, StoreError> {
        self.locked(|stops| stops.iter().filter(|s| s.is_watched).count())
    }
}

fn validate(stop: &Stop) -> Result<(), StoreError> {
    if stop.name.is_empty() {
        return Err(StoreError::InvalidArgument("name"));
    }
    if stop.reference.is_empty() {
        return Err(StoreError::InvalidArgument("reference"));
    }
    if stop.line.details.id.is_empty() {
        return Err(StoreError::InvalidArgument("line"));
    }
    if stop.line.direction.id.is_empty() {
        return Err(StoreError::InvalidArgument("direction"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IdName, Line};
    use chrono::NaiveDate;

    fn line() -> Line {
        Line::new(
            IdName::new("21", "Ligne 21"),
            IdName::new("A", "Caen Nord"),
            "#1208d8",
        )
    }

    fn stop(id: i32) -> Stop {
        Stop::new(id, format!("Stop {id}"), format!("ref-{id}"), line())
    }

    fn eta() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2018, 4, 9)
            .unwrap()
            .and_hms_opt(14, 12, 0)
            .unwrap()
    }

    #[test]
    fn add_and_list_preserves_order() {
        let store = MemoryStopStore::new();
        store.add_stop(&stop(3)).unwrap();
        store.add_stop(&stop(1)).unwrap();
        store.add_stop(&stop(2)).unwrap();

        let ids: Vec<i32> = store.all_stops().unwrap().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let store = MemoryStopStore::new();
        store.add_stop(&stop(1)).unwrap();
        assert_eq!(store.add_stop(&stop(1)), Err(StoreError::Duplicate));
    }

    #[test]
    fn incomplete_stop_is_rejected() {
        let store = MemoryStopStore::new();

        let mut nameless = stop(1);
        nameless.name.clear();
        assert_eq!(
            store.add_stop(&nameless),
            Err(StoreError::InvalidArgument("name"))
        );

        let mut refless = stop(1);
        refless.reference.clear();
        assert_eq!(
            store.add_stop(&refless),
            Err(StoreError::InvalidArgument("reference"))
        );
    }

    #[test]
    fn watch_flag_and_count() {
        let store = MemoryStopStore::new();
        store.add_stop(&stop(1)).unwrap();
        store.add_stop(&stop(2)).unwrap();

        store.set_watched(&stop(1), true).unwrap();
        assert_eq!(store.watched_stop_count().unwrap(), 1);
        assert_eq!(store.watched_stops().unwrap()[0].id, 1);

        store.set_watched(&stop(1), false).unwrap();
        assert_eq!(store.watched_stop_count().unwrap(), 0);
    }

    #[test]
    fn unwatching_clears_the_recorded_eta() {
        let store = MemoryStopStore::new();
        store.add_stop(&stop(1)).unwrap();
        store.set_watched(&stop(1), true).unwrap();
        store.update_watched_eta(&stop(1), eta()).unwrap();

        assert_eq!(store.watched_stops().unwrap()[0].last_eta, Some(eta()));

        store.set_watched(&stop(1), false).unwrap();
        store.set_watched(&stop(1), true).unwrap();
        assert_eq!(store.watched_stops().unwrap()[0].last_eta, None);
    }

    #[test]
    fn reference_update_targets_by_id() {
        let store = MemoryStopStore::new();
        store.add_stop(&stop(1)).unwrap();

        let mut repaired = stop(1);
        repaired.reference = "fresh".into();
        assert!(store.update_stop_reference(&repaired).unwrap());
        assert_eq!(store.all_stops().unwrap()[0].reference, "fresh");

        assert!(!store.update_stop_reference(&stop(99)).unwrap());
    }

    #[test]
    fn delete_unknown_is_a_no_op() {
        let store = MemoryStopStore::new();
        store.add_stop(&stop(1)).unwrap();
        store.delete_stop(&stop(2)).unwrap();
        assert_eq!(store.all_stops().unwrap().len(), 1);
    }
}
