//! Watch/notification decision engine.
//!
//! A periodic tick checks every watched stop's next arrival and decides,
//! with hysteresis, whether to keep tracking or to alert the user and stand
//! down. The engine owns no timer of its own: an external scheduler calls
//! [`StopWatcher::check_now`] and is told through [`TickScheduler`] when
//! ticking is pointless because nothing is watched anymore.

use std::sync::Arc;

use chrono::{Duration, Local, NaiveDateTime};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::domain::{Stop, StopSchedule};
use crate::notify::NotificationSink;
use crate::store::{StopStore, StoreError};
use crate::timeo::BusDataProvider;

/// Tuning knobs for the decision engine.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// A bus due within this much of "now" fires the arrival notification.
    pub arrival_threshold: Duration,
    /// Window for the stale-ETA "bus probably passed" rule.
    pub eta_regression_window: Duration,
    /// How often the external scheduler should tick while enabled.
    pub check_interval: std::time::Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            arrival_threshold: Duration::seconds(90),
            eta_regression_window: Duration::minutes(5),
            check_interval: std::time::Duration::from_secs(60),
        }
    }
}

/// Emitted whenever a stop's watched state changes, so the embedding UI can
/// keep its list in sync without polling.
#[derive(Debug, Clone)]
pub struct WatchEvent {
    pub stop: Stop,
    pub watched: bool,
}

/// Handle to whatever drives the periodic tick.
///
/// Both operations are idempotent. `disable` only stops future ticks; it
/// never interrupts one in flight.
pub trait TickScheduler: Send + Sync {
    fn enable(&self);
    fn disable(&self);
}

/// What one tick did, for logging and tests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// Arrival notifications fired (stops unwatched).
    pub arrivals: usize,
    /// Stops still being tracked after this tick.
    pub tracking: usize,
    /// The batch fetch failed; no transitions happened.
    pub fetch_failed: bool,
    /// This tick turned the scheduler off.
    pub scheduler_disabled: bool,
}

/// The decision engine itself.
pub struct StopWatcher<P> {
    provider: P,
    store: Arc<dyn StopStore>,
    sink: Arc<dyn NotificationSink>,
    scheduler: Arc<dyn TickScheduler>,
    events: Option<UnboundedSender<WatchEvent>>,
    config: WatchConfig,
}

impl<P: BusDataProvider> StopWatcher<P> {
    pub fn new(
        provider: P,
        store: Arc<dyn StopStore>,
        sink: Arc<dyn NotificationSink>,
        scheduler: Arc<dyn TickScheduler>,
        config: WatchConfig,
    ) -> Self {
        Self {
            provider,
            store,
            sink,
            scheduler,
            events: None,
            config,
        }
    }

    /// Deliver watch-state changes to this channel.
    pub fn with_events(mut self, events: UnboundedSender<WatchEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Start watching a stop and make sure the tick is running.
    pub fn watch(&self, stop: &Stop) -> Result<(), StoreError> {
        self.store.set_watched(stop, true)?;
        self.scheduler.enable();
        self.emit(stop, true);
        Ok(())
    }

    /// Stop watching a stop at the user's request.
    pub fn unwatch(&self, stop: &Stop) -> Result<(), StoreError> {
        self.store.set_watched(stop, false)?;
        self.sink.cancel(stop.id);
        if self.store.watched_stop_count()? == 0 {
            self.scheduler.disable();
        }
        self.emit(stop, false);
        Ok(())
    }

    /// One tick: fetch schedules for every watched stop and transition each.
    ///
    /// A provider failure makes no transitions at all: displayed per-stop
    /// notifications are taken down (their times are no longer trustworthy)
    /// and a single network-error notice goes up instead. Store failures
    /// propagate to the caller.
    pub async fn check_now(&self) -> Result<TickReport, StoreError> {
        let watched = self.store.watched_stops()?;
        debug!(count = watched.len(), "checking stop schedules for notifications");

        let mut report = TickReport::default();

        if !watched.is_empty() {
            match self.provider.get_schedules(&watched).await {
                Ok(schedules) => {
                    let now = Local::now().naive_local();
                    for schedule in &schedules {
                        self.transition(schedule, now, &mut report)?;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "schedule check failed");
                    for stop in &watched {
                        self.sink.cancel(stop.id);
                    }
                    self.sink.show_network_error();
                    report.fetch_failed = true;
                }
            }
        }

        if self.store.watched_stop_count()? == 0 {
            self.scheduler.disable();
            report.scheduler_disabled = true;
        }

        Ok(report)
    }

    fn transition(
        &self,
        schedule: &StopSchedule,
        now: NaiveDateTime,
        report: &mut TickReport,
    ) -> Result<(), StoreError> {
        let Some(next) = schedule.next_arrival() else {
            return Ok(());
        };

        let eta = next.schedule_time;
        let stop = &schedule.stop;

        if eta <= now + self.config.arrival_threshold {
            debug!(stop = %stop, %eta, "bus is due");
            self.finish(schedule)?;
            report.arrivals += 1;
            return Ok(());
        }

        // The feed cannot report "the bus already went by"; a fresh
        // estimate that regresses below the recorded one is our only
        // signal that it did. Deliberately loose (any regression inside
        // the five-minute allowance fires) pending a tighter rule from
        // the operator.
        if let Some(last_eta) = stop.last_eta
            && eta < last_eta
            && eta < last_eta + self.config.eta_regression_window
        {
            debug!(
                stop = %stop,
                %last_eta,
                %eta,
                "ETA regressed since last check, assuming the bus passed"
            );
            self.finish(schedule)?;
            report.arrivals += 1;
            return Ok(());
        }

        self.store.update_watched_eta(stop, eta)?;
        self.sink.show_ongoing(schedule);
        report.tracking += 1;
        Ok(())
    }

    /// Fire the arrival notification and stand down for this stop.
    fn finish(&self, schedule: &StopSchedule) -> Result<(), StoreError> {
        self.sink.show_arrival(schedule);
        self.store.set_watched(&schedule.stop, false)?;
        self.emit(&schedule.stop, false);
        Ok(())
    }

    fn emit(&self, stop: &Stop, watched: bool) {
        if let Some(events) = &self.events {
            // Nobody listening is fine.
            let _ = events.send(WatchEvent {
                stop: stop.clone(),
                watched,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IdName, Line, ScheduleEntry};
    use crate::store::MemoryStopStore;
    use crate::timeo::TimeoError;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

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

    fn now() -> NaiveDateTime {
        Local::now().naive_local()
    }

    /// Serves canned arrival times per stop id, echoing back the stops it
    /// was asked about (the way the real conversion does).
    #[derive(Default)]
    struct FakeProvider {
        etas_by_stop: HashMap<i32, Vec<NaiveDateTime>>,
        fail: bool,
    }

    impl BusDataProvider for FakeProvider {
        async fn get_lines(&self) -> Result<Vec<Line>, TimeoError> {
            Err(TimeoError::Parse("not served by this fake".into()))
        }

        async fn get_stops(&self, _line: &Line) -> Result<Vec<Stop>, TimeoError> {
            Err(TimeoError::Parse("not served by this fake".into()))
        }

        async fn get_single_schedule(&self, _stop: &Stop) -> Result<StopSchedule, TimeoError> {
            Err(TimeoError::Parse("not served by this fake".into()))
        }

        async fn get_schedules(&self, stops: &[Stop]) -> Result<Vec<StopSchedule>, TimeoError> {
            if self.fail {
                return Err(TimeoError::Status { status: 503 });
            }

            Ok(stops
                .iter()
                .map(|stop| StopSchedule {
                    stop: stop.clone(),
                    entries: self
                        .etas_by_stop
                        .get(&stop.id)
                        .into_iter()
                        .flatten()
                        .map(|&schedule_time| ScheduleEntry {
                            schedule_time,
                            direction: "Vers Caen Nord".into(),
                        })
                        .collect(),
                    message_title: None,
                    message_body: None,
                })
                .collect())
        }
    }

    #[derive(Debug, PartialEq, Eq, Clone)]
    enum Notice {
        Arrival(i32),
        Ongoing(i32),
        Cancel(i32),
        NetworkError,
    }

    #[derive(Default)]
    struct RecordingSink {
        notices: Mutex<Vec<Notice>>,
    }

    impl RecordingSink {
        fn notices(&self) -> Vec<Notice> {
            self.notices.lock().unwrap().clone()
        }
    }

    impl NotificationSink for RecordingSink {
        fn show_arrival(&self, schedule: &StopSchedule) {
            self.notices
                .lock()
                .unwrap()
                .push(Notice::Arrival(schedule.stop.id));
        }

        fn show_ongoing(&self, schedule: &StopSchedule) {
            self.notices
                .lock()
                .unwrap()
                .push(Notice::Ongoing(schedule.stop.id));
        }

        fn cancel(&self, stop_id: i32) {
            self.notices.lock().unwrap().push(Notice::Cancel(stop_id));
        }

        fn show_network_error(&self) {
            self.notices.lock().unwrap().push(Notice::NetworkError);
        }
    }

    #[derive(Default)]
    struct CountingScheduler {
        enables: AtomicUsize,
        disables: AtomicUsize,
    }

    impl TickScheduler for CountingScheduler {
        fn enable(&self) {
            self.enables.fetch_add(1, Ordering::SeqCst);
        }

        fn disable(&self) {
            self.disables.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Harness {
        watcher: StopWatcher<FakeProvider>,
        store: Arc<MemoryStopStore>,
        sink: Arc<RecordingSink>,
        scheduler: Arc<CountingScheduler>,
        events: tokio::sync::mpsc::UnboundedReceiver<WatchEvent>,
    }

    fn harness(provider: FakeProvider, watched: &[Stop]) -> Harness {
        let store = Arc::new(MemoryStopStore::new());
        for stop in watched {
            store.add_stop(stop).unwrap();
            store.set_watched(stop, true).unwrap();
        }

        let sink = Arc::new(RecordingSink::default());
        let scheduler = Arc::new(CountingScheduler::default());
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        let watcher = StopWatcher::new(
            provider,
            store.clone() as Arc<dyn StopStore>,
            sink.clone() as Arc<dyn NotificationSink>,
            scheduler.clone() as Arc<dyn TickScheduler>,
            WatchConfig::default(),
        )
        .with_events(tx);

        Harness {
            watcher,
            store,
            sink,
            scheduler,
            events: rx,
        }
    }

    #[tokio::test]
    async fn advancing_eta_updates_tracking_without_notifying() {
        let last = now() + Duration::minutes(60);
        let fresh = last + Duration::minutes(2);

        let provider = FakeProvider {
            etas_by_stop: HashMap::from([(1, vec![fresh])]),
            fail: false,
        };

        let mut h = harness(provider, &[stop(1)]);
        h.store.update_watched_eta(&stop(1), last).unwrap();

        let report = h.watcher.check_now().await.unwrap();

        assert_eq!(report.arrivals, 0);
        assert_eq!(report.tracking, 1);
        assert_eq!(h.sink.notices(), vec![Notice::Ongoing(1)]);

        let watched = h.store.watched_stops().unwrap();
        assert!(watched[0].is_watched);
        assert_eq!(watched[0].last_eta, Some(fresh));
        assert!(h.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn imminent_bus_fires_and_unwatches() {
        let provider = FakeProvider {
            etas_by_stop: HashMap::from([(1, vec![now() + Duration::seconds(60)])]),
            fail: false,
        };

        let mut h = harness(provider, &[stop(1)]);
        let report = h.watcher.check_now().await.unwrap();

        assert_eq!(report.arrivals, 1);
        assert_eq!(h.sink.notices(), vec![Notice::Arrival(1)]);
        assert_eq!(h.store.watched_stop_count().unwrap(), 0);

        let event = h.events.try_recv().unwrap();
        assert_eq!(event.stop.id, 1);
        assert!(!event.watched);
    }

    #[tokio::test]
    async fn regressed_eta_means_the_bus_passed() {
        let last = now() + Duration::minutes(60);

        let provider = FakeProvider {
            etas_by_stop: HashMap::from([(1, vec![last - Duration::minutes(1)])]),
            fail: false,
        };

        let mut h = harness(provider, &[stop(1)]);
        h.store.update_watched_eta(&stop(1), last).unwrap();

        let report = h.watcher.check_now().await.unwrap();

        assert_eq!(report.arrivals, 1);
        assert_eq!(h.sink.notices(), vec![Notice::Arrival(1)]);
        assert_eq!(h.store.watched_stop_count().unwrap(), 0);
        assert!(!h.events.try_recv().unwrap().watched);
    }

    #[tokio::test]
    async fn first_observation_records_the_eta() {
        let eta = now() + Duration::minutes(30);

        let provider = FakeProvider {
            etas_by_stop: HashMap::from([(1, vec![eta, eta + Duration::minutes(20)])]),
            fail: false,
        };

        let h = harness(provider, &[stop(1)]);
        let report = h.watcher.check_now().await.unwrap();

        assert_eq!(report.tracking, 1);
        assert_eq!(h.store.watched_stops().unwrap()[0].last_eta, Some(eta));
    }

    #[tokio::test]
    async fn fetch_failure_changes_nothing_and_notifies_once() {
        let last = now() + Duration::minutes(10);

        let provider = FakeProvider {
            etas_by_stop: HashMap::new(),
            fail: true,
        };

        let mut h = harness(provider, &[stop(1), stop(2)]);
        h.store.update_watched_eta(&stop(1), last).unwrap();

        let report = h.watcher.check_now().await.unwrap();

        assert!(report.fetch_failed);
        assert_eq!(report.arrivals, 0);

        // Stale per-stop notifications down, one error notice up.
        assert_eq!(
            h.sink.notices(),
            vec![Notice::Cancel(1), Notice::Cancel(2), Notice::NetworkError]
        );

        // No transitions: both still watched, ETA untouched.
        let watched = h.store.watched_stops().unwrap();
        assert_eq!(watched.len(), 2);
        assert_eq!(watched[0].last_eta, Some(last));
        assert!(h.events.try_recv().is_err());

        // Stops remain watched, so the tick stays enabled.
        assert_eq!(h.scheduler.disables.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn scheduler_disabled_exactly_once_when_last_stop_unwatches() {
        let provider = FakeProvider {
            etas_by_stop: HashMap::from([(1, vec![now() + Duration::seconds(30)])]),
            fail: false,
        };

        let h = harness(provider, &[stop(1)]);
        let report = h.watcher.check_now().await.unwrap();

        assert!(report.scheduler_disabled);
        assert_eq!(h.scheduler.disables.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_entry_list_makes_no_transition() {
        let provider = FakeProvider {
            etas_by_stop: HashMap::new(),
            fail: false,
        };

        let h = harness(provider, &[stop(1)]);
        let report = h.watcher.check_now().await.unwrap();

        assert_eq!(report.arrivals, 0);
        assert_eq!(report.tracking, 0);
        assert!(h.sink.notices().is_empty());
        assert_eq!(h.store.watched_stop_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn watch_enables_and_unwatch_disables() {
        let provider = FakeProvider::default();
        let mut h = harness(provider, &[]);

        h.store.add_stop(&stop(1)).unwrap();

        h.watcher.watch(&stop(1)).unwrap();
        assert_eq!(h.scheduler.enables.load(Ordering::SeqCst), 1);
        assert_eq!(h.store.watched_stop_count().unwrap(), 1);
        assert!(h.events.try_recv().unwrap().watched);

        h.watcher.unwatch(&stop(1)).unwrap();
        assert_eq!(h.scheduler.disables.load(Ordering::SeqCst), 1);
        assert_eq!(h.sink.notices(), vec![Notice::Cancel(1)]);
        assert!(!h.events.try_recv().unwrap().watched);
    }
}
