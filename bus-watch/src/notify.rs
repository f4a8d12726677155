//! Notification sink.
//!
//! Actual delivery (system tray, mobile shade, whatever) belongs to the
//! embedding application; the engines only know this contract. Per-stop
//! notifications are keyed by the stop id so a fresh arrival notice
//! replaces the ongoing schedule display for the same stop.

use tracing::{info, warn};

use crate::domain::StopSchedule;

/// Where the decision engine's notifications go.
pub trait NotificationSink: Send + Sync {
    /// The bus is about to arrive (or probably already has): final,
    /// attention-grabbing notice for this stop.
    fn show_arrival(&self, schedule: &StopSchedule);

    /// Refresh the persistent "upcoming buses" display for this stop with
    /// the latest entry list.
    fn show_ongoing(&self, schedule: &StopSchedule);

    /// Take down whatever is currently displayed for this stop.
    fn cancel(&self, stop_id: i32);

    /// The schedule check could not reach or understand the upstream; one
    /// standing notice, not one per stop.
    fn show_network_error(&self);
}

/// Sink that writes notifications to the log, for headless runs.
#[derive(Debug, Default)]
pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn show_arrival(&self, schedule: &StopSchedule) {
        match schedule.next_arrival() {
            Some(entry) => info!(
                stop = %schedule.stop,
                at = %entry.schedule_time.format("%H:%M"),
                "bus is imminent"
            ),
            None => info!(stop = %schedule.stop, "bus is imminent"),
        }
    }

    fn show_ongoing(&self, schedule: &StopSchedule) {
        let times = schedule
            .entries
            .iter()
            .map(|e| e.schedule_time.format("%H:%M").to_string())
            .collect::<Vec<_>>()
            .join(", ");
        info!(stop = %schedule.stop, %times, "upcoming buses");
    }

    fn cancel(&self, stop_id: i32) {
        info!(stop_id, "clearing notification");
    }

    fn show_network_error(&self) {
        warn!("could not check schedules; will retry on the next tick");
    }
}
