//! Timeo realtime API access.
//!
//! The upstream is a per-network HTTP relay: a single URL per city whose
//! endpoints are distinguished by query parameters, answering in XML (with
//! a JSON side channel for the global traffic alert). Quirks worth knowing:
//!
//! - Stop *references* (the key schedule queries want) are reassigned by
//!   the server every so often; only the stop *code* is stable.
//! - Labels arrive in all-caps and are normalized here for display.
//! - Instead of data, the server may answer with a blocking advisory,
//!   a service-disruption message that is itself meaningful.

mod client;
mod convert;
mod error;
mod names;
mod provider;
pub mod types;
mod xml;

pub use client::{TimeoClient, TimeoConfig};
pub use convert::{
    alert_from_prehome, ensure_ok, lines_from_listing, schedules_from_doc, stops_from_listing,
};
pub use error::TimeoError;
pub use names::smart_capitalize;
pub use provider::BusDataProvider;
pub use xml::{decode_listing, decode_schedules};
