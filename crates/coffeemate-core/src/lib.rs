//! Session scheduling and lifecycle engine for coffeemate.
//!
//! This crate defines the "ports" (store and notifier traits) that the
//! infrastructure layer implements, plus the engine built on them: the group
//! partitioner, the session lifecycle manager, the recurring scheduler and
//! the coordinator that ties sessions to chat messages. It depends only on
//! `coffeemate-types` -- never on `coffeemate-infra` or any database crate.

pub mod clock;
pub mod coordinator;
pub mod grouping;
pub mod lifecycle;
pub mod messages;
pub mod notify;
pub mod repository;
pub mod retry;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod test_support;
