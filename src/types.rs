//! Common types used throughout the rating engine

use crate::config::RatingConstants;
use crate::rating::alliance::Alliance;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a competing team
pub type TeamId = String;

/// Identifier of an independent rating space (e.g. one per uploading party)
pub type ScopeId = String;

/// Unique identifier for matches
pub type MatchId = Uuid;

/// Side of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::A => write!(f, "A"),
            Side::B => write!(f, "B"),
        }
    }
}

/// Current skill estimate for one team inside one rating scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRatingState {
    pub team_id: TeamId,
    pub rating: f64,
    pub uncertainty: f64,
    pub matches_played: u32,
}

impl TeamRatingState {
    /// Fresh state for a team seen for the first time
    pub fn new(team_id: impl Into<TeamId>, constants: &RatingConstants) -> Self {
        Self {
            team_id: team_id.into(),
            rating: constants.initial_rating,
            uncertainty: constants.initial_uncertainty,
            matches_played: 0,
        }
    }

    /// Explicit snapshot, mostly useful for seeding and tests
    pub fn with_values(team_id: impl Into<TeamId>, rating: f64, uncertainty: f64) -> Self {
        Self {
            team_id: team_id.into(),
            rating,
            uncertainty,
            matches_played: 0,
        }
    }

    /// State after one match, as described by its update record
    pub fn advanced(&self, record: &MatchUpdateRecord) -> Self {
        Self {
            team_id: self.team_id.clone(),
            rating: record.rating_after,
            uncertainty: record.uncertainty_after,
            matches_played: self.matches_played + 1,
        }
    }
}

/// Alliance-level summary. Derived per match and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllianceStats {
    pub rating: f64,
    pub uncertainty: f64,
}

/// Ternary result derived from the two scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchResult {
    AllianceAWins,
    AllianceBWins,
    Tie,
}

impl MatchResult {
    pub fn from_scores(score_a: u32, score_b: u32) -> Self {
        match score_a.cmp(&score_b) {
            std::cmp::Ordering::Greater => MatchResult::AllianceAWins,
            std::cmp::Ordering::Less => MatchResult::AllianceBWins,
            std::cmp::Ordering::Equal => MatchResult::Tie,
        }
    }

    /// Actual outcome scored for the given side (1 win, 0 loss, 0.5 tie)
    pub fn actual_for(&self, side: Side) -> f64 {
        match (self, side) {
            (MatchResult::Tie, _) => 0.5,
            (MatchResult::AllianceAWins, Side::A) | (MatchResult::AllianceBWins, Side::B) => 1.0,
            _ => 0.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MatchResult::AllianceAWins => "alliance_a",
            MatchResult::AllianceBWins => "alliance_b",
            MatchResult::Tie => "tie",
        }
    }
}

/// A match with its participants resolved to rating snapshots
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub alliance_a: Alliance,
    pub alliance_b: Alliance,
    pub score_a: u32,
    pub score_b: u32,
}

impl MatchOutcome {
    pub fn result(&self) -> MatchResult {
        MatchResult::from_scores(self.score_a, self.score_b)
    }
}

/// Immutable before/after record for one team in one match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchUpdateRecord {
    pub team_id: TeamId,
    pub rating_before: f64,
    pub rating_after: f64,
    pub uncertainty_before: f64,
    pub uncertainty_after: f64,
    pub credit_factor: f64,
    pub expected_outcome: f64,
    pub surprise_factor: f64,
}

impl MatchUpdateRecord {
    pub fn rating_delta(&self) -> f64 {
        self.rating_after - self.rating_before
    }
}

/// Everything appended to the audit log for one replayed match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchAuditEntry {
    pub scope_id: ScopeId,
    pub match_id: MatchId,
    pub played_at: DateTime<Utc>,
    pub result: MatchResult,
    pub records: Vec<MatchUpdateRecord>,
}
