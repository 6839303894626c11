//! Tracks how long each application and window title holds the user's focus, split into work
//! hours and the rest of the day. Totals are kept as plain text daily summaries that survive
//! restarts and can be read or edited by hand.
//!

pub mod cli;
pub mod config;
pub mod daemon;
pub mod tracking;
pub mod utils;
pub mod window_api;
