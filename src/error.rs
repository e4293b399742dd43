//! Error types for the rating engine
//!
//! The numeric core is total and never returns errors. Everything that touches
//! collaborators (stores, sinks, configuration, malformed history) reports
//! through these types.

use crate::types::{ScopeId, Side};
use uuid::Uuid;

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific rating scenarios
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RatingError {
    #[error("Match {match_id} has no team on alliance {side}")]
    MissingTeamSlot { match_id: Uuid, side: Side },

    #[error("Alliance must contain at least one team")]
    EmptyAlliance,

    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("Storage error: {message}")]
    StorageError { message: String },

    #[error("Replay of scope {scope_id} interrupted before match index {next_index}")]
    ReplayInterrupted { scope_id: ScopeId, next_index: usize },

    #[error("Internal error: {message}")]
    InternalError { message: String },
}
