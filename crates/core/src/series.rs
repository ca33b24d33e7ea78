//! Helpers over quarterly series with explicit gaps.

use rust_decimal::{Decimal, RoundingStrategy};
use statrs::statistics::Statistics;

/// `a / b`, or `None` when either side is missing or the divisor is exactly zero.
pub fn safe_div(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) if b != 0.0 => Some(a / b),
        _ => None,
    }
}

/// Present values among the last `n` entries, in original order.
pub fn trailing_vals(series: &[Option<f64>], n: usize) -> Vec<f64> {
    let start = series.len().saturating_sub(n);
    series[start..].iter().flatten().copied().collect()
}

pub fn trailing_avg(series: &[Option<f64>], n: usize) -> Option<f64> {
    mean(&trailing_vals(series, n))
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().mean())
    }
}

/// Mean of the last `n` values (all of them if fewer).
pub fn tail_mean(values: &[f64], n: usize) -> Option<f64> {
    mean(&values[values.len().saturating_sub(n)..])
}

/// Sample standard deviation over |mean|; infinite when fewer than two values or a zero mean.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::INFINITY;
    }
    let m = values.iter().mean();
    if m == 0.0 {
        return f64::INFINITY;
    }
    values.iter().std_dev() / m.abs()
}

/// `series[i] / series[i - lag] - 1`, skipping pairs with a gap or a zero base.
fn growth_rates(series: &[Option<f64>], lag: usize) -> Vec<f64> {
    (lag..series.len())
        .filter_map(|i| safe_div(series[i], series[i - lag]))
        .map(|ratio| ratio - 1.0)
        .collect()
}

pub fn qoq_growth_rates(series: &[Option<f64>]) -> Vec<f64> {
    growth_rates(series, 1)
}

pub fn yoy_growth_rates(series: &[Option<f64>]) -> Vec<f64> {
    growth_rates(series, 4)
}

/// Direction of a strictly monotonic run of at least three points.
///
/// Returns `1` for strictly increasing, `-1` for strictly decreasing and `0` otherwise.
pub fn is_monotonic(values: &[f64]) -> i8 {
    if values.len() < 3 {
        return 0;
    }
    if values.windows(2).all(|w| w[1] > w[0]) {
        1
    } else if values.windows(2).all(|w| w[1] < w[0]) {
        -1
    } else {
        0
    }
}

/// Share of the trailing `n`-quarter total contributed by each of those quarters.
///
/// Falls back to a uniform split when fewer than `n` values are present or the total is zero.
pub fn compute_seasonal_pattern(series: &[Option<f64>], n: usize) -> Vec<f64> {
    let uniform = vec![1.0 / n as f64; n];
    let tail = trailing_vals(series, n);
    if tail.len() < n {
        return uniform;
    }
    let total: f64 = tail.iter().sum();
    if total == 0.0 {
        return uniform;
    }
    tail.iter().map(|v| v / total).collect()
}

/// Round half to even at `places` decimals, applied to the exact stored value.
///
/// Scaling by `10^places` first would round twice (`0.28395` would come out as `0.284`).
pub fn round_to(value: f64, places: u32) -> f64 {
    if places == 0 {
        return value.round_ties_even();
    }
    // NaN, infinities and values beyond Decimal's range (already whole) pass through.
    let Some(exact) = Decimal::from_f64_retain(value) else {
        return value;
    };
    exact
        .round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven)
        .to_string()
        .parse()
        .unwrap_or(value)
}
