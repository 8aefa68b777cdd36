//! Middleware layers.

pub mod metrics;
