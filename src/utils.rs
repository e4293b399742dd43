//! Utility functions for the rating engine

use crate::types::MatchId;
use uuid::Uuid;

/// Generate a new unique match ID
pub fn generate_match_id() -> MatchId {
    Uuid::new_v4()
}
