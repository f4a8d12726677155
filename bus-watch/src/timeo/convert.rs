//! Conversion from wire DTOs to domain types.
//!
//! Everything user-visible is normalized here: labels run through
//! `smart_capitalize` and colors become `#RRGGBB`, while the feed's bare
//! "HH:MM" times are resolved against the current wall clock. Batch schedule
//! responses are matched back to the stops that requested them; response
//! items nobody asked for are dropped, not raised.

use chrono::NaiveDateTime;
use tracing::debug;

use crate::domain::{IdName, Line, ScheduleEntry, Stop, StopSchedule, TrafficAlert, next_occurrence};

use super::error::TimeoError;
use super::names::smart_capitalize;
use super::types::{ApiStatus, LineData, ListingDoc, MessageData, PreHome, ScheduleDoc};

/// Fallback color when the feed sends something unusable.
const DEFAULT_COLOR: &str = "#000000";

/// Raise server-reported failure states out of a decoded document.
///
/// A status code other than `"000"` is an application error; a blocking
/// document-level message is a service advisory that replaces the data.
pub fn ensure_ok(
    status: Option<&ApiStatus>,
    message: Option<&MessageData>,
) -> Result<(), TimeoError> {
    if let Some(status) = status
        && status.code != "000"
    {
        return Err(TimeoError::Api {
            code: status.code.clone(),
            message: status.message.clone(),
        });
    }

    if let Some(message) = message
        && message.blocking
        && let Some(title) = &message.title
    {
        return Err(TimeoError::BlockingAdvisory {
            title: title.clone(),
            body: message.body.clone(),
        });
    }

    Ok(())
}

/// Convert a listing document into line variants.
pub fn lines_from_listing(doc: &ListingDoc) -> Result<Vec<Line>, TimeoError> {
    ensure_ok(doc.status.as_ref(), doc.message.as_ref())?;

    Ok(doc.entries.iter().map(|e| line_from_data(&e.line)).collect())
}

/// Convert a listing document into stops.
///
/// Entries missing a stop code, name or reference describe nothing the rest
/// of the crate can use and are skipped.
pub fn stops_from_listing(doc: &ListingDoc) -> Result<Vec<Stop>, TimeoError> {
    ensure_ok(doc.status.as_ref(), doc.message.as_ref())?;

    let mut stops = Vec::with_capacity(doc.entries.len());
    for entry in &doc.entries {
        let (Some(code), Some(name), Some(reference)) =
            (&entry.stop.code, &entry.stop.name, &entry.reference)
        else {
            continue;
        };

        let Ok(id) = code.parse::<i32>() else {
            debug!(code = %code, "skipping stop with non-numeric code");
            continue;
        };

        stops.push(Stop::new(
            id,
            smart_capitalize(name),
            reference.clone(),
            line_from_data(&entry.line),
        ));
    }

    Ok(stops)
}

/// Convert a schedule document into per-stop schedules, matched back to the
/// stops that were requested.
///
/// Association is by (stop code, line id, direction id); response items
/// matching no requested stop are dropped. A blocking per-stop message
/// becomes the schedule's advisory and suppresses entry parsing: the feed
/// never means both "here are arrival times" and "this stop is not served".
pub fn schedules_from_doc(
    doc: &ScheduleDoc,
    requested: &[Stop],
    now: NaiveDateTime,
) -> Result<Vec<StopSchedule>, TimeoError> {
    ensure_ok(doc.status.as_ref(), doc.message.as_ref())?;

    let mut schedules = Vec::with_capacity(doc.schedules.len());

    for data in &doc.schedules {
        let Some(desc) = &data.description else {
            continue;
        };

        let stop = requested.iter().find(|s| {
            desc.stop_code
                .as_deref()
                .and_then(|c| c.parse::<i32>().ok())
                == Some(s.id)
                && desc.line_id.as_deref() == Some(s.line.details.id.as_str())
                && desc.direction_id.as_deref() == Some(s.line.direction.id.as_str())
        });

        let Some(stop) = stop else {
            debug!(
                code = desc.stop_code.as_deref().unwrap_or(""),
                "dropping schedule for a stop nobody asked about"
            );
            continue;
        };

        let advisory = data
            .messages
            .iter()
            .find(|m| m.blocking && m.title.is_some());

        if let Some(message) = advisory {
            schedules.push(StopSchedule {
                stop: stop.clone(),
                entries: Vec::new(),
                message_title: message.title.clone(),
                message_body: message.body.as_ref().map(|b| b.replace("  ", " ")),
            });
            continue;
        }

        let mut entries = Vec::with_capacity(data.passings.len());
        for passing in &data.passings {
            let (Some(time), Some(destination)) = (&passing.time, &passing.destination) else {
                continue;
            };

            let schedule_time = next_occurrence(time, now)
                .map_err(|e| TimeoError::Parse(format!("bad passing time {time:?}: {e}")))?;

            entries.push(ScheduleEntry {
                schedule_time,
                direction: smart_capitalize(destination),
            });
        }

        entries.sort_by_key(|e| e.schedule_time);

        schedules.push(StopSchedule {
            stop: stop.clone(),
            entries,
            message_title: None,
            message_body: None,
        });
    }

    Ok(schedules)
}

/// Convert the pre-home payload into a global traffic alert, if one is up.
pub fn alert_from_prehome(prehome: PreHome) -> Option<TrafficAlert> {
    prehome.alerte.map(|a| TrafficAlert {
        id: a.id_alerte,
        label: a.libelle_alerte.trim().replace("  ", " - "),
        url: a.url_alerte,
    })
}

fn line_from_data(data: &LineData) -> Line {
    Line::new(
        IdName::new(data.code.clone(), smart_capitalize(&data.name)),
        IdName::new(
            data.direction_id.clone(),
            data.direction_name
                .as_deref()
                .map(smart_capitalize)
                .unwrap_or_default(),
        ),
        normalize_color(data.color.as_deref()),
    )
}

/// Normalize a wire color to `#RRGGBB`.
///
/// The lines endpoint sends a bare decimal integer; the schedule endpoint
/// sends `#`-prefixed hex already.
fn normalize_color(raw: Option<&str>) -> String {
    match raw {
        Some(hex) if hex.starts_with('#') => hex.to_string(),
        Some(decimal) => match decimal.parse::<u32>() {
            Ok(n) => format!("#{:06x}", n & 0x00ff_ffff),
            Err(_) => DEFAULT_COLOR.to_string(),
        },
        None => DEFAULT_COLOR.to_string(),
    }
}
