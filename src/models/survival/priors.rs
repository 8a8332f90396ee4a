//! Prior specifications and log-density helpers.
//!
//! Each model parameter carries an independent prior looked up by name.
//! Natural-mortality priors (`meanU`, `sU`, `k`) are typically narrowed
//! from a control-only fit; the defaults below are deliberately wide.

use std::collections::BTreeMap;

use statrs::function::beta::ln_beta;
use statrs::function::gamma::ln_gamma;

use super::types::ModelVariant;

/// A univariate prior distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Prior {
    Uniform { low: f64, high: f64 },
    Normal { mean: f64, sd: f64 },
    Gamma { shape: f64, rate: f64 },
    Beta { alpha: f64, beta: f64 },
}

impl Prior {
    /// Log-density at `value`; `-∞` outside the support.
    #[must_use]
    pub fn log_density(self, value: f64) -> f64 {
        if !value.is_finite() {
            return f64::NEG_INFINITY;
        }
        match self {
            Self::Uniform { low, high } => {
                if (low..=high).contains(&value) {
                    -(high - low).ln()
                } else {
                    f64::NEG_INFINITY
                }
            }
            Self::Normal { mean, sd } => {
                let z = (value - mean) / sd;
                -0.5 * z.mul_add(z, std::f64::consts::TAU.ln()) - sd.ln()
            }
            Self::Gamma { shape, rate } => {
                if value <= 0.0 {
                    return f64::NEG_INFINITY;
                }
                shape.mul_add(rate.ln(), (shape - 1.0) * value.ln()) - rate * value
                    - ln_gamma(shape)
            }
            Self::Beta { alpha, beta } => {
                if !(0.0..=1.0).contains(&value) {
                    return f64::NEG_INFINITY;
                }
                (alpha - 1.0).mul_add(value.ln(), (beta - 1.0) * (1.0 - value).ln())
                    - ln_beta(alpha, beta)
            }
        }
    }

    /// Whether the hyperparameters are numerically valid.
    #[must_use]
    pub fn is_valid(self) -> bool {
        match self {
            Self::Uniform { low, high } => low.is_finite() && high.is_finite() && low < high,
            Self::Normal { mean, sd } => mean.is_finite() && sd > 0.0 && sd.is_finite(),
            Self::Gamma { shape, rate } => shape > 0.0 && rate > 0.0,
            Self::Beta { alpha, beta } => alpha > 0.0 && beta > 0.0,
        }
    }
}

/// Name-keyed prior lookup for one model variant.
#[derive(Debug, Clone, Default)]
pub struct PriorSet {
    priors: BTreeMap<String, Prior>,
}

impl PriorSet {
    /// Wide defaults for every scalar parameter of `variant`, scaled by
    /// the study end `tmax`.
    #[must_use]
    pub fn defaults(variant: ModelVariant, tmax: f64) -> Self {
        let mut set = Self::default();
        for name in variant.response_parameter_names() {
            let prior = if name.starts_with('a') || name.starts_with('b') {
                Prior::Gamma {
                    shape: 1.0,
                    rate: 0.1,
                }
            } else {
                Prior::Uniform {
                    low: 0.0,
                    high: 1.0,
                }
            };
            set.insert(&name, prior);
        }
        for name in ["meanI1", "meanI2"] {
            set.insert(
                name,
                Prior::Uniform {
                    low: 1.0e-2,
                    high: 4.0 * tmax,
                },
            );
        }
        set.insert(
            "meanU",
            Prior::Uniform {
                low: 1.0e-2,
                high: 8.0 * tmax,
            },
        );
        for name in ["sI1", "sI2", "sU"] {
            set.insert(
                name,
                Prior::Uniform {
                    low: 1.0e-2,
                    high: 50.0,
                },
            );
        }
        set.insert(
            "k",
            Prior::Uniform {
                low: 1.0e-9,
                high: 1.0,
            },
        );
        set
    }

    pub fn insert(&mut self, name: &str, prior: Prior) {
        self.priors.insert(name.to_owned(), prior);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Prior> {
        self.priors.get(name).copied()
    }

    /// Whether every stored prior has valid hyperparameters.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.priors.values().all(|prior| prior.is_valid())
    }
}

/// Log-pmf of `Binomial(n, p)` at `successes`, extended continuously in
/// the count so latent infection counts proposed as reals stay usable.
#[must_use]
pub fn binomial_log_pmf(successes: f64, trials: f64, p: f64) -> f64 {
    if !(0.0..=trials).contains(&successes) || !(0.0..=1.0).contains(&p) {
        return f64::NEG_INFINITY;
    }
    let failures = trials - successes;
    if p == 0.0 {
        return if successes == 0.0 { 0.0 } else { f64::NEG_INFINITY };
    }
    if p == 1.0 {
        return if failures == 0.0 { 0.0 } else { f64::NEG_INFINITY };
    }
    let ln_choose = ln_gamma(trials + 1.0) - ln_gamma(successes + 1.0) - ln_gamma(failures + 1.0);
    successes.mul_add(p.ln(), failures * (1.0 - p).ln()) + ln_choose
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn uniform_density_is_flat_inside_support() {
        let prior = Prior::Uniform { low: 0.0, high: 2.0 };
        assert_relative_eq!(prior.log_density(1.0), -(2.0_f64.ln()));
        assert!(prior.log_density(3.0).is_infinite());
    }

    #[test]
    fn gamma_density_rejects_non_positive_values() {
        let prior = Prior::Gamma { shape: 2.0, rate: 1.0 };
        assert!(prior.log_density(0.0).is_infinite());
        assert!(prior.log_density(1.0).is_finite());
    }

    #[test]
    fn beta_density_integrates_shape_into_support() {
        let prior = Prior::Beta { alpha: 2.0, beta: 2.0 };
        assert_relative_eq!(prior.log_density(0.5), (1.5_f64).ln(), epsilon = 1.0e-12);
    }

    #[test]
    fn defaults_cover_all_single_variant_scalars() {
        let set = PriorSet::defaults(ModelVariant::Single, 14.0);
        for name in ModelVariant::Single.scalar_parameter_names() {
            assert!(set.get(&name).is_some(), "missing prior for {name}");
        }
        assert!(set.is_valid());
    }

    #[test]
    fn defaults_cover_all_comparison_variant_scalars() {
        let set = PriorSet::defaults(ModelVariant::HomVsHetComparison, 14.0);
        for name in ModelVariant::HomVsHetComparison.scalar_parameter_names() {
            assert!(set.get(&name).is_some(), "missing prior for {name}");
        }
    }

    #[test]
    fn binomial_log_pmf_matches_closed_form() {
        // C(4, 2) * 0.5^4 = 6/16
        assert_relative_eq!(
            binomial_log_pmf(2.0, 4.0, 0.5),
            (6.0 / 16.0_f64).ln(),
            epsilon = 1.0e-12
        );
    }

    #[test]
    fn binomial_log_pmf_handles_degenerate_probability() {
        assert_relative_eq!(binomial_log_pmf(0.0, 10.0, 0.0), 0.0);
        assert!(binomial_log_pmf(1.0, 10.0, 0.0).is_infinite());
        assert_relative_eq!(binomial_log_pmf(10.0, 10.0, 1.0), 0.0);
    }
}
