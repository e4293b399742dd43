//! Credit-and-surprise rating engine
//!
//! Leaf-first: alliance aggregation, the win probability model, credit
//! allocation and the per-team update rule, combined by the calculator.
//! Storage and audit interfaces for collaborators live alongside.

pub mod alliance;
pub mod audit;
pub mod calculator;
pub mod credit;
pub mod outcome;
pub mod storage;
pub mod updater;

// Re-export commonly used types
pub use alliance::{compute_alliance_stats, Alliance};
pub use audit::{InMemoryAuditLog, TeamHistoryPoint, UpdateSink};
pub use calculator::{
    compute_match_update, compute_tie_update, rate_outcome, CreditSurpriseCalculator,
    MatchUpdate, RatingCalculator,
};
pub use credit::{allocate_credits, credit_pair, strength, CreditSplit};
pub use outcome::{erf, expected_outcome, normal_cdf};
pub use storage::{InMemoryRatingStore, RatingStore};
pub use updater::{confidence_from_uncertainty, update_rating, update_uncertainty};
