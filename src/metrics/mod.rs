//! Metrics for the rating service
//!
//! Prometheus counters for applied and skipped matches, per-team updates and
//! regime changes, plus replay timing.

pub mod collector;

pub use collector::{MetricsTimer, ReplayMetrics};
