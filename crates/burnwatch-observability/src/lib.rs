//! # burnwatch-observability
//!
//! Structured logging for burnwatch. Log levels are configurable globally and
//! per component; output is human-readable text or JSON lines.

pub mod tracing_setup;

pub use tracing_setup::{init_tracing, LogConfig};
