//! Credit allocation among alliance members
//!
//! The alliance-level rating delta is split between teammates by relative
//! strength (`rating / uncertainty`), blended with an even split by `w`.

use crate::rating::alliance::{rank_by_rating, Alliance};
use serde::{Deserialize, Serialize};

/// Credit shares from one pairwise comparison
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CreditSplit {
    pub credit_a: f64,
    pub credit_b: f64,
}

/// Confidence-weighted strength of a team
pub fn strength(rating: f64, uncertainty: f64) -> f64 {
    rating / uncertainty
}

/// Split credit between two teams.
///
/// `w` weights the strength-proportional share against an even 0.5 split.
pub fn credit_pair(
    rating_a: f64,
    uncertainty_a: f64,
    rating_b: f64,
    uncertainty_b: f64,
    w: f64,
) -> CreditSplit {
    let strength_a = strength(rating_a, uncertainty_a);
    let strength_b = strength(rating_b, uncertainty_b);
    let total = strength_a + strength_b;

    if total == 0.0 {
        return CreditSplit {
            credit_a: 0.5,
            credit_b: 0.5,
        };
    }

    let base_a = strength_a / total;
    let base_b = strength_b / total;

    CreditSplit {
        credit_a: w * base_a + (1.0 - w) * 0.5,
        credit_b: w * base_b + (1.0 - w) * 0.5,
    }
}

/// Credit factor for every member of `alliance`, in slot order.
///
/// A trio is split in two overlapping pairs (strongest/middle and
/// middle/weakest); the middle member receives the mean of its two shares.
/// Trio credits are not normalised and need not sum to 1.
pub fn allocate_credits(alliance: &Alliance, w: f64) -> Vec<f64> {
    match alliance {
        Alliance::Pair([a, b]) => {
            let split = credit_pair(a.rating, a.uncertainty, b.rating, b.uncertainty, w);
            vec![split.credit_a, split.credit_b]
        }
        Alliance::Trio(members) => {
            let ranked = rank_by_rating(members);
            let (strongest, middle, weakest) = (ranked[0], ranked[1], ranked[2]);

            let upper = credit_pair(
                members[strongest].rating,
                members[strongest].uncertainty,
                members[middle].rating,
                members[middle].uncertainty,
                w,
            );
            let lower = credit_pair(
                members[middle].rating,
                members[middle].uncertainty,
                members[weakest].rating,
                members[weakest].uncertainty,
                w,
            );

            let mut credits = vec![0.0; 3];
            credits[strongest] = upper.credit_a;
            credits[middle] = (upper.credit_b + lower.credit_a) / 2.0;
            credits[weakest] = lower.credit_b;
            credits
        }
        // Solo and oversized alliances: the first member takes full credit.
        Alliance::Solo(_) | Alliance::Oversized(_) => {
            let mut credits = vec![0.0; alliance.len()];
            credits[0] = 1.0;
            credits
        }
    }
}
