//! Simple to use cli/daemon for tracking your work time. Sessions live in a shared Postgres
//! table, so the same history follows you across machines, and a resident daemon keeps desktop
//! reminders aligned with whatever is actually running.
//!

pub mod cli;
pub mod daemon;
pub mod notify;
pub mod reminders;
pub mod settings;
pub mod store;
pub mod timer;
pub mod utils;
