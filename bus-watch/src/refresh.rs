//! Stop reference reconciliation.
//!
//! The upstream periodically reassigns the opaque references it wants in
//! schedule queries, which strands every saved stop using an old one. The
//! updater re-fetches the stop list of each affected line and rewrites the
//! saved references in place, so the user never has to delete and re-add
//! their stops. Local ids and list order are never disturbed.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{Stop, StopSchedule};
use crate::store::{StopStore, StoreError};
use crate::timeo::{BusDataProvider, TimeoError};

/// Errors from a reconciliation run.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error(transparent)]
    Provider(#[from] TimeoError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Repairs stale stop references against the live stop lists.
pub struct ReferenceUpdater<P> {
    provider: P,
    store: Arc<dyn StopStore>,
}

impl<P: BusDataProvider> ReferenceUpdater<P> {
    pub fn new(provider: P, store: Arc<dyn StopStore>) -> Self {
        Self { provider, store }
    }

    /// Update the references of every outdated stop in `stops`.
    ///
    /// Stops sharing a line share one fetch: the walk groups by line (first
    /// seen order, direction variants collapsed) and fetches each line at
    /// most once, and only if at least one of its members is outdated.
    /// Fetched stops are matched back to saved ones by name and line; the
    /// upstream knows nothing about our local ids. Saved stops the fresh
    /// list no longer mentions keep their old reference and are only
    /// reported in the log.
    ///
    /// `progress` is called per processed line with
    /// `(lines_processed, total_stops)`. A provider or store failure aborts
    /// the run; references already rewritten stay rewritten.
    ///
    /// Returns the number of references updated.
    pub async fn update_all_references(
        &self,
        stops: &[Stop],
        mut progress: impl FnMut(usize, usize),
    ) -> Result<usize, RefreshError> {
        let total = stops.len();
        let mut processed_lines: Vec<String> = Vec::new();
        let mut updated = 0;

        progress(0, total);

        for stop in stops {
            if !stop.is_outdated || processed_lines.iter().any(|id| *id == stop.line.details.id) {
                continue;
            }

            info!(line = %stop.line, "refreshing stop references");
            progress(processed_lines.len(), total);

            let fresh = self.provider.get_stops(&stop.line).await?;
            processed_lines.push(stop.line.details.id.clone());

            for fresh_stop in &fresh {
                let Some(saved) = stops
                    .iter()
                    .find(|s| s.name == fresh_stop.name && s.line == fresh_stop.line)
                else {
                    continue;
                };

                let mut repaired = saved.clone();
                repaired.reference = fresh_stop.reference.clone();
                repaired.is_outdated = false;

                if self.store.update_stop_reference(&repaired)? {
                    updated += 1;
                }
            }

            for orphan in stops.iter().filter(|s| {
                s.is_outdated
                    && s.line.details.id == stop.line.details.id
                    && !fresh
                        .iter()
                        .any(|f| f.name == s.name && f.line == s.line)
            }) {
                warn!(stop = %orphan, "no update found");
            }
        }

        progress(processed_lines.len(), total);
        info!(updated, total, "stop reference update finished");

        Ok(updated)
    }
}

/// Flag saved stops whose reference no longer resolves.
///
/// Called after a schedule refresh: when the upstream answers for fewer
/// stops than were asked, every stop that got no answer (or that has no
/// reference at all) is marked outdated. Matching answer counts mean
/// nothing is stale. Returns how many stops were flagged.
pub fn mark_outdated(stops: &mut [Stop], schedules: &[StopSchedule]) -> usize {
    if stops.len() == schedules.len() {
        return 0;
    }

    let mut flagged = 0;
    for stop in stops.iter_mut() {
        if stop.reference.is_empty() || !schedules.iter().any(|s| s.stop.id == stop.id) {
            stop.is_outdated = true;
            flagged += 1;
        }
    }

    flagged
}
