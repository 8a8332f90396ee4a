//! Time-to-death hazard kernel.
//!
//! Both infected and uninfected hosts die according to the same parametric
//! family, differing only in shape and scale: a gamma-distributed
//! time-to-death with an additive constant background hazard `k`. The
//! hazard is `h(t) = h_gamma(t) + k`, giving the density
//!
//! `f(t) = exp(-k t) * (k * (1 - G(t)) + g(t))`
//!
//! where `g`/`G` are the gamma density and CDF with shape `shape` and
//! scale `scale = mean / shape`. The cumulative probability has no
//! closed form in this parameterization and is integrated numerically.
//!
//! Shape, scale, and `k` are kept positive by the priors; the kernel does
//! not re-validate them.

use statrs::function::gamma::{gamma_lr, ln_gamma};

use crate::utils::simpson;

/// Quadrature panels per `cumulative` call.
const CUMULATIVE_PANELS: usize = 64;

/// Gamma density with shape/scale parameterization, evaluated in log space.
fn gamma_density(t: f64, shape: f64, scale: f64) -> f64 {
    if t < 0.0 {
        return 0.0;
    }
    if t == 0.0 {
        // Limit of the density at the origin.
        return match shape.partial_cmp(&1.0) {
            Some(std::cmp::Ordering::Greater) => 0.0,
            Some(std::cmp::Ordering::Equal) => 1.0 / scale,
            _ => f64::INFINITY,
        };
    }
    let log_density = (shape - 1.0).mul_add(t.ln(), -t / scale) - ln_gamma(shape) - shape * scale.ln();
    log_density.exp()
}

/// Gamma CDF with shape/scale parameterization.
#[must_use]
pub fn gamma_cumulative(t: f64, shape: f64, scale: f64) -> f64 {
    if t <= 0.0 {
        return 0.0;
    }
    gamma_lr(shape, t / scale)
}

/// Probability density of time to death at `t`.
///
/// Finite and non-negative for all `t > 0` with positive parameters; at
/// `t == 0` the density inherits the gamma density's origin limit.
#[must_use]
pub fn density(t: f64, shape: f64, scale: f64, background: f64) -> f64 {
    if t < 0.0 {
        return 0.0;
    }
    let tail = 1.0 - gamma_cumulative(t, shape, scale);
    let value = (-background * t).exp() * background.mul_add(tail.max(0.0), gamma_density(t, shape, scale));
    if value.is_finite() { value.max(0.0) } else { value }
}

/// Probability of death inside `[t0, t1]`, by numeric integration of
/// [`density`], clamped into `[0, 1]`.
#[must_use]
pub fn cumulative(t0: f64, t1: f64, shape: f64, scale: f64, background: f64) -> f64 {
    if t1 <= t0 {
        return 0.0;
    }
    simpson(
        |t| density(t, shape, scale, background),
        t0.max(0.0),
        t1,
        CUMULATIVE_PANELS,
    )
    .clamp(0.0, 1.0)
}

/// Probability of surviving past `tmax`.
#[must_use]
pub fn survival(tmax: f64, shape: f64, scale: f64, background: f64) -> f64 {
    (1.0 - cumulative(0.0, tmax, shape, scale, background)).clamp(0.0, 1.0)
}
