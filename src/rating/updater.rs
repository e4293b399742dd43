//! Per-team rating and uncertainty update rules

use crate::config::RatingConstants;

/// Uncertainty multiplier applied on a regime change
pub const REGIME_CHANGE_GROWTH: f64 = 1.2;

/// Fraction of `credit * surprise` removed from uncertainty on an expected result
pub const CONFIDENCE_SHRINK: f64 = 0.5;

/// Uncertainty used as the 0% reference for display confidence
pub const DEFAULT_CONFIDENCE_BASE: f64 = 50.0;

/// Apply a credit-weighted delta to a rating, never dropping below zero
pub fn update_rating(rating: f64, credit_factor: f64, delta: f64, k: f64) -> f64 {
    (rating + k * credit_factor * delta).max(0.0)
}

/// Next uncertainty for a team.
///
/// A result more surprising than the regime change threshold suggests the
/// team's true skill moved, so uncertainty widens (capped at the initial
/// uncertainty). Otherwise it shrinks in proportion to credit and surprise,
/// bounded below by the floor.
pub fn update_uncertainty(
    uncertainty: f64,
    credit_factor: f64,
    surprise: f64,
    constants: &RatingConstants,
) -> f64 {
    if surprise > constants.regime_change_threshold {
        (uncertainty * REGIME_CHANGE_GROWTH).min(constants.initial_uncertainty)
    } else {
        (uncertainty * (1.0 - CONFIDENCE_SHRINK * credit_factor * surprise)).max(constants.u_min)
    }
}

/// Whether a surprise value triggers the widening branch
pub fn is_regime_change(surprise: f64, constants: &RatingConstants) -> bool {
    surprise > constants.regime_change_threshold
}

/// Display confidence in percent: 100 at zero uncertainty, 0 at or above `base`
pub fn confidence_from_uncertainty(uncertainty: f64, base: f64) -> u8 {
    let ratio = (uncertainty / base).min(1.0);
    (100.0 * (1.0 - ratio)).round().clamp(0.0, 100.0) as u8
}
