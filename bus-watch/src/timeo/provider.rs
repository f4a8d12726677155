//! Provider seam over the upstream API.

use std::future::Future;

use crate::domain::{Line, Stop, StopSchedule};

use super::error::TimeoError;

/// The slice of the upstream API the engines consume.
///
/// `TimeoClient` is the real implementation; tests drive the reconciler and
/// the decision engine through hand-rolled fakes. The `Send` bound on the
/// returned futures lets callers run ticks from spawned tasks.
pub trait BusDataProvider {
    /// Enumerate every line variant on the network.
    fn get_lines(&self) -> impl Future<Output = Result<Vec<Line>, TimeoError>> + Send;

    /// Enumerate the stops of one line variant.
    fn get_stops(&self, line: &Line) -> impl Future<Output = Result<Vec<Stop>, TimeoError>> + Send;

    /// Fetch the upcoming schedule for a single stop.
    fn get_single_schedule(
        &self,
        stop: &Stop,
    ) -> impl Future<Output = Result<StopSchedule, TimeoError>> + Send;

    /// Fetch schedules for a batch of stops in one request.
    fn get_schedules(
        &self,
        stops: &[Stop],
    ) -> impl Future<Output = Result<Vec<StopSchedule>, TimeoError>> + Send;
}
