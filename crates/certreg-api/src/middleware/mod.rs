//! # Middleware
//!
//! - `metrics`: request counters and latency histograms, plus the
//!   `/metrics` handler.

pub mod metrics;
