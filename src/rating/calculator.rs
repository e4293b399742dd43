//! Match-level rating calculation
//!
//! Ties the aggregator, outcome model, credit allocator and updater together
//! into per-team update records, and exposes the calculator behind a trait so
//! the replay layer does not depend on one concrete model.

use crate::config::RatingConstants;
use crate::error::{RatingError, Result};
use crate::rating::alliance::Alliance;
use crate::rating::credit::allocate_credits;
use crate::rating::outcome::expected_outcome_between;
use crate::rating::updater::{update_rating, update_uncertainty};
use crate::types::{
    AllianceStats, MatchOutcome, MatchResult, MatchUpdateRecord, Side, TeamId, TeamRatingState,
};
use serde::{Deserialize, Serialize};

/// Update records for both sides of a decided match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchUpdate {
    pub winning_updates: Vec<MatchUpdateRecord>,
    pub losing_updates: Vec<MatchUpdateRecord>,
}

/// Records for every member of `side` given the opposing alliance summary
fn rate_side(
    side: &Alliance,
    own: &AllianceStats,
    other: &AllianceStats,
    actual: f64,
    constants: &RatingConstants,
) -> Vec<MatchUpdateRecord> {
    let expected = expected_outcome_between(own, other, constants.u_match);
    let delta = actual - expected;
    let surprise = delta.abs();
    let credits = allocate_credits(side, constants.w);

    side.members()
        .iter()
        .zip(credits)
        .map(|(member, credit)| MatchUpdateRecord {
            team_id: member.team_id.clone(),
            rating_before: member.rating,
            rating_after: update_rating(member.rating, credit, delta, constants.k),
            uncertainty_before: member.uncertainty,
            uncertainty_after: update_uncertainty(member.uncertainty, credit, surprise, constants),
            credit_factor: credit,
            expected_outcome: expected,
            surprise_factor: surprise,
        })
        .collect()
}

/// Rate both sides with the given actual outcomes.
///
/// The expected outcome is evaluated once per direction instead of taking
/// `1 - other`; rounding may make the two values differ slightly and that
/// asymmetry is kept as-is. Confirm with the model owners before collapsing
/// this into a single call.
fn rate_both(
    first: &Alliance,
    second: &Alliance,
    actual_first: f64,
    actual_second: f64,
    constants: &RatingConstants,
) -> (Vec<MatchUpdateRecord>, Vec<MatchUpdateRecord>) {
    let first_stats = first.aggregate();
    let second_stats = second.aggregate();

    let first_updates = rate_side(first, &first_stats, &second_stats, actual_first, constants);
    let second_updates = rate_side(second, &second_stats, &first_stats, actual_second, constants);

    (first_updates, second_updates)
}

/// Rating updates for a decided match
pub fn compute_match_update(
    winners: &Alliance,
    losers: &Alliance,
    constants: &RatingConstants,
) -> MatchUpdate {
    let (winning_updates, losing_updates) = rate_both(winners, losers, 1.0, 0.0, constants);

    MatchUpdate {
        winning_updates,
        losing_updates,
    }
}

/// Rating updates for a tied match, side A members first
pub fn compute_tie_update(
    side_a: &Alliance,
    side_b: &Alliance,
    constants: &RatingConstants,
) -> Vec<MatchUpdateRecord> {
    let (mut updates, updates_b) = rate_both(side_a, side_b, 0.5, 0.5, constants);
    updates.extend(updates_b);
    updates
}

/// Rating updates for any outcome, alliance A members first then alliance B
pub fn rate_outcome(outcome: &MatchOutcome, constants: &RatingConstants) -> Vec<MatchUpdateRecord> {
    let result = outcome.result();
    let (a, b) = (&outcome.alliance_a, &outcome.alliance_b);

    match result {
        MatchResult::Tie => compute_tie_update(a, b, constants),
        MatchResult::AllianceAWins | MatchResult::AllianceBWins => {
            let (updates_a, updates_b) = rate_both(
                a,
                b,
                result.actual_for(Side::A),
                result.actual_for(Side::B),
                constants,
            );
            updates_a.into_iter().chain(updates_b).collect()
        }
    }
}

/// Trait for turning resolved match outcomes into rating updates
pub trait RatingCalculator: Send + Sync {
    /// Update records for every participant, alliance A first
    fn rate_match(&self, outcome: &MatchOutcome) -> Vec<MatchUpdateRecord>;

    /// State for a team referenced for the first time
    fn initial_state(&self, team_id: &TeamId) -> TeamRatingState;

    /// Constants the calculator runs with
    fn constants(&self) -> &RatingConstants;

    /// Get current configuration as JSON
    fn config(&self) -> serde_json::Value;

    /// Update configuration from JSON
    fn update_config(&mut self, config: serde_json::Value) -> Result<()>;
}

/// Credit-and-surprise rating model
#[derive(Debug, Clone)]
pub struct CreditSurpriseCalculator {
    constants: RatingConstants,
}

impl CreditSurpriseCalculator {
    /// Create a calculator after validating its constants
    pub fn new(constants: RatingConstants) -> Result<Self> {
        constants.validate()?;
        Ok(Self { constants })
    }
}

impl Default for CreditSurpriseCalculator {
    fn default() -> Self {
        Self {
            constants: RatingConstants::default(),
        }
    }
}

impl RatingCalculator for CreditSurpriseCalculator {
    fn rate_match(&self, outcome: &MatchOutcome) -> Vec<MatchUpdateRecord> {
        rate_outcome(outcome, &self.constants)
    }

    fn initial_state(&self, team_id: &TeamId) -> TeamRatingState {
        TeamRatingState::new(team_id.clone(), &self.constants)
    }

    fn constants(&self) -> &RatingConstants {
        &self.constants
    }

    fn config(&self) -> serde_json::Value {
        serde_json::to_value(&self.constants).unwrap_or(serde_json::Value::Null)
    }

    fn update_config(&mut self, config: serde_json::Value) -> Result<()> {
        let constants: RatingConstants = serde_json::from_value(config).map_err(|e| {
            RatingError::InvalidConfiguration {
                message: format!("Invalid rating constants: {}", e),
            }
        })?;

        constants.validate()?;
        self.constants = constants;
        Ok(())
    }
}
