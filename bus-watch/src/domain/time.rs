//! Wall-clock time handling for the upstream feed.
//!
//! The realtime endpoints report arrival times as bare "HH:MM" strings with
//! no date attached. A time at or after the current wall-clock time means
//! today; a time before it means tomorrow (a 00:05 arrival fetched at 23:58
//! has not already happened).

use chrono::{Days, NaiveDateTime, NaiveTime};

/// Error returned when parsing an invalid time string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// Parse a strict "HH:MM" string.
pub fn parse_hhmm(s: &str) -> Result<NaiveTime, TimeError> {
    if s.len() != 5 {
        return Err(TimeError::new("expected HH:MM format"));
    }

    let bytes = s.as_bytes();

    if bytes[2] != b':' {
        return Err(TimeError::new("expected colon at position 2"));
    }

    let hour = parse_two_digits(&bytes[0..2]).ok_or_else(|| TimeError::new("invalid hour digits"))?;
    if hour > 23 {
        return Err(TimeError::new("hour must be 0-23"));
    }

    let minute =
        parse_two_digits(&bytes[3..5]).ok_or_else(|| TimeError::new("invalid minute digits"))?;
    if minute > 59 {
        return Err(TimeError::new("minute must be 0-59"));
    }

    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| TimeError::new("invalid time"))
}

/// Resolve an "HH:MM" string to its next occurrence at or after `now`'s day
/// boundary: today if the time has not passed yet, tomorrow otherwise.
pub fn next_occurrence(s: &str, now: NaiveDateTime) -> Result<NaiveDateTime, TimeError> {
    let time = parse_hhmm(s)?;

    let date = if time < now.time() {
        now.date()
            .checked_add_days(Days::new(1))
            .ok_or_else(|| TimeError::new("date out of range"))?
    } else {
        now.date()
    };

    Ok(date.and_time(time))
}

fn parse_two_digits(bytes: &[u8]) -> Option<u32> {
    let tens = (bytes[0] as char).to_digit(10)?;
    let units = (bytes[1] as char).to_digit(10)?;
    Some(tens * 10 + units)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    proptest! {
        /// Every well-formed HH:MM string parses.
        #[test]
        fn well_formed_always_parses(h in 0u32..24, m in 0u32..60) {
            let s = format!("{h:02}:{m:02}");
            prop_assert!(parse_hhmm(&s).is_ok());
        }

        /// The resolved occurrence is never in the past relative to the
        /// minute boundary of `now`.
        #[test]
        fn occurrence_never_in_the_past(h in 0u32..24, m in 0u32..60, now_h in 0u32..24, now_m in 0u32..60) {
            let s = format!("{h:02}:{m:02}");
            let now = NaiveDate::from_ymd_opt(2018, 4, 9).unwrap()
                .and_hms_opt(now_h, now_m, 0).unwrap();
            let resolved = next_occurrence(&s, now).unwrap();
            prop_assert!(resolved >= now);
        }
    }
}
