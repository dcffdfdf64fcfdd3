//! Observability setup for coffeemate.

pub mod tracing_setup;
