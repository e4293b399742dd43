//! Rating model constants
//!
//! The whole bundle is passed by reference into every engine call so that two
//! rating spaces can run with different tunings side by side.

use crate::error::{RatingError, Result};
use serde::{Deserialize, Serialize};

/// Tunable constants of the credit-and-surprise model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConstants {
    /// Rating step size (K)
    pub k: f64,
    /// Weight of relative strength in credit allocation (W)
    pub w: f64,
    /// Irreducible per-match noise (U_MATCH)
    pub u_match: f64,
    /// Uncertainty floor (U_MIN)
    pub u_min: f64,
    /// Rating assigned to a team on first reference
    pub initial_rating: f64,
    /// Uncertainty assigned on first reference; also the regime-change ceiling
    pub initial_uncertainty: f64,
    /// Surprise above which uncertainty widens instead of shrinking
    pub regime_change_threshold: f64,
}

impl Default for RatingConstants {
    fn default() -> Self {
        Self {
            k: 32.0,
            w: 0.7,
            u_match: 20.0,
            u_min: 10.0,
            initial_rating: 100.0,
            initial_uncertainty: 50.0,
            regime_change_threshold: 0.7,
        }
    }
}

impl RatingConstants {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| -> anyhow::Error {
            RatingError::InvalidConfiguration {
                message: message.to_string(),
            }
            .into()
        };

        if !self.k.is_finite() || self.k < 0.0 {
            return Err(invalid("K must be a non-negative number"));
        }
        if !(0.0..=1.0).contains(&self.w) {
            return Err(invalid("W must lie in [0, 1]"));
        }
        if !self.u_match.is_finite() || self.u_match < 0.0 {
            return Err(invalid("Match noise must be non-negative"));
        }
        if !self.u_min.is_finite() || self.u_min <= 0.0 {
            return Err(invalid("Uncertainty floor must be positive"));
        }
        if !self.initial_rating.is_finite() || self.initial_rating < 0.0 {
            return Err(invalid("Initial rating must be non-negative"));
        }
        if !self.initial_uncertainty.is_finite() || self.initial_uncertainty < self.u_min {
            return Err(invalid(
                "Initial uncertainty must be at least the uncertainty floor",
            ));
        }
        if !(0.0..=1.0).contains(&self.regime_change_threshold) {
            return Err(invalid("Regime change threshold must lie in [0, 1]"));
        }

        Ok(())
    }
}
