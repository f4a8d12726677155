//! Wire DTOs for the upstream payloads.
//!
//! Field vocabulary is upstream-owned and French (`als`, `ligne`, `arret`,
//! `horaire`, `duree`...); these structs keep English names but document the
//! tag each one mirrors. Everything optional is genuinely optional on the
//! wire: the feed omits elements rather than sending them empty.

use serde::Deserialize;

/// Application-level status element (`<erreur>`). Code `"000"` means OK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiStatus {
    pub code: String,
    pub message: String,
}

/// An informational or blocking message (`<message>`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageData {
    /// `<titre>`
    pub title: Option<String>,
    /// `<texte>`
    pub body: Option<String>,
    /// `<bloquant>`
    pub blocking: bool,
}

/// Line description inside a listing entry (`<ligne>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineData {
    /// `<code>`
    pub code: String,
    /// `<nom>`
    pub name: String,
    /// `<sens>`
    pub direction_id: String,
    /// `<vers>`
    pub direction_name: Option<String>,
    /// `<couleur>`, a bare decimal integer on this endpoint.
    pub color: Option<String>,
}

/// Stop description inside a listing entry (`<arret>`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopData {
    /// `<code>`
    pub code: Option<String>,
    /// `<nom>`
    pub name: Option<String>,
}

/// One `<als>` element of a line/stop listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub line: LineData,
    pub stop: StopData,
    /// `<refs>`, the schedule-query reference for this stop.
    pub reference: Option<String>,
}

/// A decoded line/stop listing document (`xml=1` endpoints).
#[derive(Debug, Clone, Default)]
pub struct ListingDoc {
    pub status: Option<ApiStatus>,
    pub message: Option<MessageData>,
    pub entries: Vec<ListingEntry>,
}

/// Identification block of a schedule (`<description>`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptionData {
    /// `<code>`, the stop code.
    pub stop_code: Option<String>,
    /// `<arret>`, the stop name.
    pub stop_name: Option<String>,
    /// `<ligne>`
    pub line_id: Option<String>,
    /// `<ligne_nom>`
    pub line_name: Option<String>,
    /// `<sens>`
    pub direction_id: Option<String>,
    /// `<vers>`
    pub direction_name: Option<String>,
    /// `<couleur>`, already `#`-prefixed hex on this endpoint.
    pub color: Option<String>,
}

/// One predicted passing (`<passage>`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassingData {
    /// `<duree>`, wall-clock "HH:MM".
    pub time: Option<String>,
    /// `<destination>`
    pub destination: Option<String>,
}

/// One `<horaire>` element: the schedule block for a single stop.
#[derive(Debug, Clone, Default)]
pub struct ScheduleData {
    pub description: Option<DescriptionData>,
    pub passings: Vec<PassingData>,
    pub messages: Vec<MessageData>,
}

/// A decoded schedule document (`xml=3` endpoint).
#[derive(Debug, Clone, Default)]
pub struct ScheduleDoc {
    pub status: Option<ApiStatus>,
    pub message: Option<MessageData>,
    pub schedules: Vec<ScheduleData>,
}

/// Pre-home JSON payload carrying the optional global traffic alert.
#[derive(Debug, Clone, Deserialize)]
pub struct PreHome {
    pub alerte: Option<AlertData>,
}

/// The `alerte` object of the pre-home payload.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertData {
    pub id_alerte: i32,
    pub libelle_alerte: String,
    pub url_alerte: String,
}
