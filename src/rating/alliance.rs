//! Alliance composition and aggregation
//!
//! An alliance is one side of a match. Its size is carried in the type so that
//! every consumer handles the solo, pair, trio and oversized cases explicitly.

use crate::error::{RatingError, Result};
use crate::types::{AllianceStats, TeamRatingState};
use std::cmp::Ordering;

/// Share of the alliance rating taken from its strongest member
pub const STRONGEST_WEIGHT: f64 = 0.7;

/// Share of the alliance rating taken from its weakest member
pub const WEAKEST_WEIGHT: f64 = 0.3;

/// One side of a match, by size
#[derive(Debug, Clone, PartialEq)]
pub enum Alliance {
    Solo(TeamRatingState),
    Pair([TeamRatingState; 2]),
    Trio([TeamRatingState; 3]),
    /// More members than the game allows; tolerated, never rejected
    Oversized(Vec<TeamRatingState>),
}

impl Alliance {
    /// Build an alliance from its members in slot order
    pub fn new(mut members: Vec<TeamRatingState>) -> Result<Self> {
        match members.len() {
            0 => Err(RatingError::EmptyAlliance.into()),
            1 => Ok(Alliance::Solo(members.remove(0))),
            2 => Ok(Alliance::Pair(into_array(members)?)),
            3 => Ok(Alliance::Trio(into_array(members)?)),
            _ => Ok(Alliance::Oversized(members)),
        }
    }

    /// Members in slot order
    pub fn members(&self) -> &[TeamRatingState] {
        match self {
            Alliance::Solo(member) => std::slice::from_ref(member),
            Alliance::Pair(members) => members,
            Alliance::Trio(members) => members,
            Alliance::Oversized(members) => members,
        }
    }

    pub fn len(&self) -> usize {
        self.members().len()
    }

    /// Always false; an alliance cannot be constructed empty
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Alliance-level rating and uncertainty.
    ///
    /// Only the strongest and the weakest member count: a strong carry
    /// dominates perceived strength while an error-prone weakest member still
    /// adds variance. In a trio the middle member is ignored.
    pub fn aggregate(&self) -> AllianceStats {
        match self {
            Alliance::Solo(member) => AllianceStats {
                rating: member.rating,
                uncertainty: member.uncertainty,
            },
            _ => {
                let members = self.members();
                let ranked = rank_by_rating(members);
                let strongest = &members[ranked[0]];
                let weakest = &members[ranked[ranked.len() - 1]];
                combine(strongest, weakest)
            }
        }
    }
}

fn into_array<const N: usize>(members: Vec<TeamRatingState>) -> Result<[TeamRatingState; N]> {
    members.try_into().map_err(|rest: Vec<TeamRatingState>| {
        RatingError::InternalError {
            message: format!("expected {} alliance members, got {}", N, rest.len()),
        }
        .into()
    })
}

fn combine(strongest: &TeamRatingState, weakest: &TeamRatingState) -> AllianceStats {
    let rating = STRONGEST_WEIGHT * strongest.rating + WEAKEST_WEIGHT * weakest.rating;
    let variance = STRONGEST_WEIGHT.powi(2) * strongest.uncertainty.powi(2)
        + WEAKEST_WEIGHT.powi(2) * weakest.uncertainty.powi(2);

    AllianceStats {
        rating,
        uncertainty: variance.sqrt(),
    }
}

/// Member indices ordered from highest to lowest rating.
///
/// The sort is stable, so equally rated members keep their slot order.
pub fn rank_by_rating(members: &[TeamRatingState]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..members.len()).collect();
    indices.sort_by(|&a, &b| {
        members[b]
            .rating
            .partial_cmp(&members[a].rating)
            .unwrap_or(Ordering::Equal)
    });
    indices
}

/// Summarise an alliance into a single rating/uncertainty pair
pub fn compute_alliance_stats(alliance: &Alliance) -> AllianceStats {
    alliance.aggregate()
}
