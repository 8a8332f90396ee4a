//! Mixture likelihood terms for deaths and survivors.
//!
//! Hosts at one dose are a mixture of truly infected and uninfected
//! animals: the latent infected count `n_infected` out of `n_at_risk`
//! weighs the infected hazard against the background hazard. Probabilities
//! driven to or below zero by floating-point cancellation are floored to
//! zero before the logarithm, producing `-∞` rather than `NaN`.

/// Fraction of hosts at risk that are infected, clamped into `[0, 1]`.
#[must_use]
pub fn mixture_weight(n_infected: f64, n_at_risk: f64) -> f64 {
    if n_at_risk <= 0.0 {
        return 0.0;
    }
    (n_infected / n_at_risk).clamp(0.0, 1.0)
}

/// `ln(p)` with the zero-floor policy: non-positive or non-finite
/// probabilities yield `-∞`, never `NaN`.
#[must_use]
pub fn log_floored(probability: f64) -> f64 {
    if probability > 0.0 && probability.is_finite() {
        probability.ln()
    } else {
        f64::NEG_INFINITY
    }
}

/// Log-likelihood of the observed deaths at one dose level.
///
/// `death_intervals` holds, per recorded death, the index of its
/// change-time interval; `probd_infected`/`probd_uninfected` are the
/// per-interval death probabilities from the hazard kernel.
#[must_use]
pub fn death_log_likelihood(
    death_intervals: &[usize],
    n_at_risk: f64,
    n_infected: f64,
    probd_infected: &[f64],
    probd_uninfected: &[f64],
) -> f64 {
    let weight = mixture_weight(n_infected, n_at_risk);
    let mut total = 0.0;
    for &interval in death_intervals {
        let mixed = weight.mul_add(
            probd_infected[interval],
            (1.0 - weight) * probd_uninfected[interval],
        );
        total += log_floored(mixed.max(0.0));
        if total == f64::NEG_INFINITY {
            return f64::NEG_INFINITY;
        }
    }
    total
}

/// Log-likelihood of `survivors` hosts all reaching study end.
///
/// The mixture survival probability raised to the survivor count,
/// assuming independence across survivors.
#[must_use]
pub fn survivor_log_likelihood(
    survivors: f64,
    n_at_risk: f64,
    n_infected: f64,
    prob_survive_infected: f64,
    prob_survive_uninfected: f64,
) -> f64 {
    if survivors <= 0.0 {
        return 0.0;
    }
    let weight = mixture_weight(n_infected, n_at_risk);
    let mixed = weight.mul_add(prob_survive_infected, (1.0 - weight) * prob_survive_uninfected);
    survivors * log_floored(mixed.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mixture_weight_is_clamped() {
        assert_relative_eq!(mixture_weight(5.0, 10.0), 0.5);
        assert_relative_eq!(mixture_weight(20.0, 10.0), 1.0);
        assert_relative_eq!(mixture_weight(3.0, 0.0), 0.0);
    }

    #[test]
    fn log_floored_never_produces_nan() {
        assert!(log_floored(0.0).is_infinite());
        assert!(log_floored(-1.0e-18).is_infinite());
        assert!(log_floored(f64::NAN).is_infinite());
        assert!(!log_floored(0.0).is_nan());
    }

    #[test]
    fn death_likelihood_mixes_infected_and_uninfected_probabilities() {
        let probd_infected = [0.2, 0.3];
        let probd_uninfected = [0.05, 0.05];
        let ll = death_log_likelihood(&[0, 1], 10.0, 5.0, &probd_infected, &probd_uninfected);
        let expected = (0.5_f64.mul_add(0.2, 0.5 * 0.05)).ln()
            + (0.5_f64.mul_add(0.3, 0.5 * 0.05)).ln();
        assert_relative_eq!(ll, expected, epsilon = 1.0e-12);
    }

    #[test]
    fn death_likelihood_is_neg_infinite_for_zero_probability_interval() {
        let ll = death_log_likelihood(&[0], 10.0, 0.0, &[0.5], &[0.0]);
        assert!(ll.is_infinite());
        assert!(!ll.is_nan());
    }

    #[test]
    fn survivor_likelihood_scales_with_count() {
        let one = survivor_log_likelihood(1.0, 10.0, 4.0, 0.6, 0.9);
        let five = survivor_log_likelihood(5.0, 10.0, 4.0, 0.6, 0.9);
        assert_relative_eq!(five, 5.0 * one, epsilon = 1.0e-12);
    }

    #[test]
    fn survivor_likelihood_is_zero_without_survivors() {
        assert_relative_eq!(survivor_log_likelihood(0.0, 10.0, 4.0, 0.6, 0.9), 0.0);
    }
}
