//! Shared domain types for coffeemate.
//!
//! Chats, daily signup sessions, participants, groups, inbound transport
//! events, configuration and the error enums used across the workspace.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod event;
pub mod schedule;
pub mod session;
