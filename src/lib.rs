//! Alliance Rating - skill ratings for alliance-based robotics matches
//!
//! Teams play in alliances of up to three, and only the alliance score is
//! observed. This crate rates individual teams from those results with a
//! credit-and-surprise model and rebuilds ratings by replaying match
//! histories in order.

pub mod config;
pub mod error;
pub mod metrics;
pub mod rating;
pub mod replay;
pub mod service;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{RatingError, Result};
pub use types::*;

// Re-export key components
pub use rating::{CreditSurpriseCalculator, RatingCalculator, RatingStore, UpdateSink};
pub use replay::{MatchRecord, MatchReplayEngine, ReplayControl};
pub use service::{AppState, RatingService};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
