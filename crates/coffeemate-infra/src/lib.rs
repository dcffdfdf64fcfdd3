//! Infrastructure layer for coffeemate.
//!
//! Implements the ports defined in `coffeemate-core`: SQLite session storage,
//! configuration loading from the data directory, and the line-delimited JSON
//! bridge that carries events in and messages out over stdio.

pub mod bridge;
pub mod config;
pub mod sqlite;
