//! # covenant-observability
//!
//! Structured JSON logging and the span vocabulary shared by the engines.

pub mod tracing_setup;

pub use tracing_setup::{init_tracing, init_tracing_with_filter, LOG_ENV_VAR};
