//! # Utilities
//!
//! Shared helpers for quantile computation, numeric quadrature, and grid
//! construction used by the hazard kernel and the posterior summarizer.

use num_traits::ToPrimitive;

#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    f64::from(u32::try_from(value).unwrap_or(u32::MAX))
}

/// Linear-interpolation percentile of a pre-sorted slice.
#[must_use]
pub fn percentile(sorted_values: &[f64], probability: f64) -> f64 {
    if sorted_values.is_empty() {
        return f64::NAN;
    }

    let clamped = probability.clamp(0.0, 1.0);
    let last = sorted_values.len() - 1;
    let position = clamped * usize_to_f64(last);
    let lower = position.floor().to_usize().unwrap_or(0);
    let upper = position.ceil().to_usize().unwrap_or(last);

    if lower == upper {
        sorted_values[lower]
    } else {
        let weight = position - usize_to_f64(lower);
        (1.0 - weight).mul_add(sorted_values[lower], weight * sorted_values[upper])
    }
}

/// Pointwise `(2.5th, 50th, 97.5th)` percentiles of an unsorted sample.
///
/// The symmetric 95% band used for every summary curve in this crate.
#[must_use]
pub fn central_interval(values: &[f64]) -> (f64, f64, f64) {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    (
        percentile(&sorted, 0.025),
        percentile(&sorted, 0.5),
        percentile(&sorted, 0.975),
    )
}

/// Composite Simpson quadrature of `f` over `[a, b]` with `panels` panels.
///
/// `panels` is rounded up to the nearest even count. Non-finite ordinates
/// are treated as zero so an integrable endpoint singularity cannot poison
/// the sum.
#[must_use]
pub fn simpson<F: Fn(f64) -> f64>(f: F, a: f64, b: f64, panels: usize) -> f64 {
    if b <= a {
        return 0.0;
    }

    let n = panels.max(2).next_multiple_of(2);
    let h = (b - a) / usize_to_f64(n);
    let eval = |t: f64| {
        let y = f(t);
        if y.is_finite() { y } else { 0.0 }
    };

    let mut sum = eval(a) + eval(b);
    for i in 1..n {
        let weight = if i % 2 == 0 { 2.0 } else { 4.0 };
        sum += weight * eval(usize_to_f64(i).mul_add(h, a));
    }
    sum * h / 3.0
}

/// Uniform grid `0, step, 2·step, …` up to and including the last multiple
/// of `step` that does not exceed `end`.
#[must_use]
pub fn time_grid(end: f64, step: f64) -> Vec<f64> {
    if !(end > 0.0 && step > 0.0) {
        return vec![0.0];
    }
    let count = (end / step).floor().to_usize().unwrap_or(0);
    (0..=count).map(|i| usize_to_f64(i) * step).collect()
}

/// Log-spaced grid `10^lo, 10^(lo+step), …` strictly below `10^hi`.
#[must_use]
pub fn log_spaced_grid(lo_exponent: f64, hi_exponent: f64, step: f64) -> Vec<f64> {
    let mut grid = Vec::new();
    if step <= 0.0 {
        return grid;
    }
    let mut i = 0;
    loop {
        let exponent = usize_to_f64(i).mul_add(step, lo_exponent);
        if exponent >= hi_exponent {
            break;
        }
        grid.push(10.0_f64.powf(exponent));
        i += 1;
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn percentile_interpolates_between_order_statistics() {
        let sorted = [0.0, 1.0, 2.0, 3.0];
        assert_relative_eq!(percentile(&sorted, 0.5), 1.5);
        assert_relative_eq!(percentile(&sorted, 0.0), 0.0);
        assert_relative_eq!(percentile(&sorted, 1.0), 3.0);
    }

    #[test]
    fn central_interval_is_ordered() {
        let values: Vec<f64> = (0..101).map(f64::from).collect();
        let (lower, median, upper) = central_interval(&values);
        assert!(lower <= median && median <= upper);
        assert_relative_eq!(median, 50.0);
    }

    #[test]
    fn simpson_integrates_polynomials_exactly() {
        let integral = simpson(|t| t * t, 0.0, 3.0, 8);
        assert_relative_eq!(integral, 9.0, epsilon = 1.0e-12);
    }

    #[test]
    fn simpson_ignores_non_finite_ordinates() {
        let integral = simpson(
            |t| if t == 0.0 { f64::INFINITY } else { 1.0 },
            0.0,
            1.0,
            64,
        );
        assert!(integral.is_finite());
    }

    #[test]
    fn time_grid_covers_zero_to_end() {
        let grid = time_grid(1.0, 0.2);
        assert_eq!(grid.len(), 6);
        assert_relative_eq!(grid[5], 1.0);
    }

    #[test]
    fn log_spaced_grid_is_increasing_and_bounded() {
        let grid = log_spaced_grid(0.0, 2.0, 0.5);
        assert_eq!(grid.len(), 4);
        assert!(grid.windows(2).all(|w| w[0] < w[1]));
        assert!(grid.iter().all(|x| *x < 100.0));
    }
}
