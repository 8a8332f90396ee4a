//! Dose-to-infection-probability response models.
//!
//! Group 1 hosts share a single per-virion infection probability `p`
//! (homogeneous model). Group 2 hosts draw a per-virion susceptibility
//! multiplier from a `Beta(a, b)` distribution relative to the baseline
//! `p` (heterogeneous model). Both models share `eps`, the probability
//! that a challenge is wholly ineffective.

use statrs::distribution::{Beta, ContinuousCDF};
use thiserror::Error;

use crate::utils::usize_to_f64;

/// Quadrature nodes for the beta-compounded expectation, in the quantile
/// domain so extreme shape parameters stay integrable.
const QUANTILE_PANELS: usize = 128;

/// Errors constructing a heterogeneous response.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ResponseError {
    #[error("beta susceptibility shape parameters must be positive and finite")]
    InvalidBetaShape,
}

/// Probability that a host receiving `dose` virions becomes infected under
/// the homogeneous model: each virion is an independent trial with success
/// probability `p`, and the whole challenge is effective with probability
/// `1 - eps`.
#[must_use]
pub fn homogeneous(dose: f64, p: f64, eps: f64) -> f64 {
    if dose <= 0.0 {
        return 0.0;
    }
    ((1.0 - eps) * (1.0 - (1.0 - p).powf(dose))).clamp(0.0, 1.0)
}

/// Heterogeneous (beta-mixed) infection response for one parameter draw.
///
/// Precomputes the beta quantile nodes once so dense dose grids reuse
/// them; construct with [`HeterogeneousResponse::new`] and evaluate with
/// [`HeterogeneousResponse::probability`].
#[derive(Debug, Clone)]
pub struct HeterogeneousResponse {
    p: f64,
    eps: f64,
    quantiles: Vec<f64>,
}

impl HeterogeneousResponse {
    /// # Errors
    ///
    /// Returns `ResponseError::InvalidBetaShape` if `a` or `b` is not a
    /// positive finite number.
    pub fn new(p: f64, a: f64, b: f64, eps: f64) -> Result<Self, ResponseError> {
        let beta = Beta::new(a, b).map_err(|_| ResponseError::InvalidBetaShape)?;
        let quantiles = (0..=QUANTILE_PANELS)
            .map(|i| {
                let u = usize_to_f64(i) / usize_to_f64(QUANTILE_PANELS);
                beta.inverse_cdf(u).clamp(0.0, 1.0)
            })
            .collect();
        Ok(Self { p, eps, quantiles })
    }

    /// Infection probability at `dose`.
    ///
    /// Computes `(1 - eps) * (1 - E[(1 - p·x)^dose])` with `x ~ Beta(a, b)`,
    /// the expectation taken by Simpson quadrature over the beta quantile
    /// function.
    #[must_use]
    pub fn probability(&self, dose: f64) -> f64 {
        if dose <= 0.0 {
            return 0.0;
        }
        let n = self.quantiles.len() - 1;
        let mut sum = 0.0;
        for (i, x) in self.quantiles.iter().enumerate() {
            let weight = if i == 0 || i == n {
                1.0
            } else if i % 2 == 0 {
                2.0
            } else {
                4.0
            };
            let survival = (1.0 - self.p * x).clamp(0.0, 1.0).powf(dose);
            sum += weight * survival;
        }
        let expectation = sum / (3.0 * usize_to_f64(n));
        ((1.0 - self.eps) * (1.0 - expectation)).clamp(0.0, 1.0)
    }
}

/// One-shot heterogeneous response evaluation.
///
/// # Errors
///
/// Returns `ResponseError::InvalidBetaShape` if `a` or `b` is not a
/// positive finite number.
pub fn heterogeneous(dose: f64, p: f64, a: f64, b: f64, eps: f64) -> Result<f64, ResponseError> {
    Ok(HeterogeneousResponse::new(p, a, b, eps)?.probability(dose))
}
