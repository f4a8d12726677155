//! Realtime bus-schedule watcher.
//!
//! The core of a bus companion app built on the Timeo realtime API. Live
//! schedules are fetched for the user's saved stops, and the server-assigned
//! stop references those fetches depend on are repaired when they go stale.
//! A decision engine watches selected stops and works out when a bus is
//! close enough to notify about. UI, persistence engine and notification
//! delivery are collaborators behind the traits in [`store`] and [`notify`].

pub mod domain;
pub mod notify;
pub mod refresh;
pub mod store;
pub mod timeo;
pub mod watch;
