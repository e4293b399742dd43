//! Service layer for the alliance rating engine
//!
//! Scope-aware orchestration over the replay engine and the wiring that
//! builds it from configuration.

pub mod app;
pub mod rating;

pub use app::{AppState, ServiceError};
pub use rating::{LeaderboardEntry, RatingService, ReplaySummary};
