//! Win probability model
//!
//! Expected outcome is the normal CDF of the rating gap scaled by the combined
//! uncertainty of both alliances plus a fixed per-match noise term. The CDF is
//! built on the Abramowitz–Stegun 7.1.26 approximation of `erf` so that
//! independent implementations agree to within 1.5e-7.

use crate::types::AllianceStats;

const A1: f64 = 0.254829592;
const A2: f64 = -0.284496736;
const A3: f64 = 1.421413741;
const A4: f64 = -1.453152027;
const A5: f64 = 1.061405429;
const P: f64 = 0.3275911;

/// Abramowitz–Stegun rational approximation of the error function
pub fn erf(x: f64) -> f64 {
    // The polynomial leaves a 1e-9 residue at zero; erf is odd, so pin it.
    if x == 0.0 {
        return 0.0;
    }

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();

    sign * y
}

/// Standard normal cumulative distribution function
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

/// Probability that side A beats side B
pub fn expected_outcome(
    rating_a: f64,
    uncertainty_a: f64,
    rating_b: f64,
    uncertainty_b: f64,
    match_noise: f64,
) -> f64 {
    let total_uncertainty =
        (uncertainty_a.powi(2) + uncertainty_b.powi(2) + match_noise.powi(2)).sqrt();

    // Unreachable with the uncertainty floor in place, but keep the model total.
    if total_uncertainty <= 0.0 {
        return match rating_a.partial_cmp(&rating_b) {
            Some(std::cmp::Ordering::Greater) => 1.0,
            Some(std::cmp::Ordering::Less) => 0.0,
            _ => 0.5,
        };
    }

    let z = (rating_a - rating_b) / total_uncertainty;
    normal_cdf(z)
}

/// Expected outcome of `own` against `other` from alliance summaries
pub fn expected_outcome_between(
    own: &AllianceStats,
    other: &AllianceStats,
    match_noise: f64,
) -> f64 {
    expected_outcome(
        own.rating,
        own.uncertainty,
        other.rating,
        other.uncertainty,
        match_noise,
    )
}
