//! Schedules and advisories.

use chrono::NaiveDateTime;

use super::Stop;

/// One predicted arrival at a stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntry {
    /// Absolute wall-clock time of the predicted arrival.
    pub schedule_time: NaiveDateTime,
    /// Destination label as shown on the bus.
    pub direction: String,
}

/// The upcoming schedule for one stop, as returned by a realtime fetch.
///
/// `entries` is sorted by ascending `schedule_time`. When the server answers
/// with a blocking advisory instead of arrival times, the message fields are
/// set and `entries` is empty: an advisory means "no usable schedule", not
/// "no buses", and the two never coexist for a single fetch.
#[derive(Debug, Clone)]
pub struct StopSchedule {
    pub stop: Stop,
    pub entries: Vec<ScheduleEntry>,
    pub message_title: Option<String>,
    pub message_body: Option<String>,
}

impl StopSchedule {
    /// The soonest predicted arrival, if any.
    pub fn next_arrival(&self) -> Option<&ScheduleEntry> {
        self.entries.first()
    }

    /// Whether this schedule carries a service-disruption advisory.
    pub fn has_advisory(&self) -> bool {
        self.message_title.is_some()
    }
}

/// A network-wide advisory from the pre-home endpoint, not tied to a stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficAlert {
    pub id: i32,
    pub label: String,
    pub url: String,
}
