use crate::describe::{pct, signed_pct};
use crate::domain::input::{Guidance, HistoricalSeries};
use crate::error::Skip;
use crate::projectors::{Forecast, ProjectionResult, MEAN_REVERSION_PULL};
use crate::series::{is_monotonic, round_to, safe_div, trailing_avg, trailing_vals};

const TREND_LOOKBACK: usize = 6;
const TREND_POINTS: usize = 3;
const TREND_DAMPENING: f64 = 0.5;
const OPERATING_LEVERAGE: f64 = 0.1;
const MARGIN_PLACES: u32 = 4;

/// Per-period `1 - cost / revenue`; `None` where either side is missing or revenue is zero.
fn gross_margins(revenue: &[Option<f64>], cost: &[Option<f64>]) -> Vec<Option<f64>> {
    revenue
        .iter()
        .zip(cost)
        .map(|(r, c)| safe_div(*c, *r).map(|ratio| 1.0 - ratio))
        .collect()
}

/// Average per-period change over the last three margins when they move strictly one way.
fn trend_delta(margins: &[Option<f64>], valid: usize) -> Option<f64> {
    let window = trailing_vals(margins, TREND_LOOKBACK.min(valid));
    if window.len() < TREND_POINTS {
        return None;
    }
    let last = &window[window.len() - TREND_POINTS..];
    if is_monotonic(last) == 0 {
        return None;
    }
    Some((last[TREND_POINTS - 1] - last[0]) / (TREND_POINTS - 1) as f64)
}

/// Gross margin: guidance (or last actual) start, pulled toward the trailing 4Q mean,
/// plus a dampened continuation of any clear three-quarter trend.
pub fn project_gross_margin(
    historical: &HistoricalSeries,
    guidance: &Guidance,
    n_quarters: usize,
) -> ProjectionResult {
    let revenue = &historical.revenue;
    let cost = &historical.cost_of_revenue;
    if revenue.is_empty() || cost.is_empty() || revenue.len() != cost.len() {
        return Err(Skip::InsufficientData);
    }

    let margins = gross_margins(revenue, cost);
    let valid: Vec<f64> = margins.iter().flatten().copied().collect();
    let Some(&last_margin) = valid.last() else {
        return Err(Skip::InsufficientData);
    };
    if valid.len() < 2 {
        return Err(Skip::InsufficientData);
    }

    let trailing_mean = trailing_avg(&margins, 4).unwrap_or(last_margin);

    let (start, mut method) = match (guidance.gross_margin_low, guidance.gross_margin_high) {
        (Some(low), Some(high)) => {
            let mid = (low + high) / 2.0;
            (mid, format!("guidance midpoint ({})", pct(mid, 1)))
        }
        (Some(bound), None) | (None, Some(bound)) => (bound, format!("guidance ({})", pct(bound, 1))),
        (None, None) => (last_margin, format!("trailing margin ({})", pct(last_margin, 1))),
    };
    method.push_str(&format!(
        " mean-reverting to trailing avg ({})",
        pct(trailing_mean, 1)
    ));

    let delta = trend_delta(&margins, valid.len()).unwrap_or(0.0);
    if delta != 0.0 {
        method.push_str(&format!(
            ", trend-adjusted ({}/Q with 50% dampening)",
            signed_pct(delta, 3)
        ));
    }

    let mut projected = Vec::with_capacity(n_quarters);
    let mut current = start;
    for t in 0..n_quarters {
        if t > 0 {
            let pull = (trailing_mean - current) * MEAN_REVERSION_PULL;
            let trend = delta * TREND_DAMPENING.powi(t as i32);
            current += pull + trend;
        }
        projected.push(round_to(current, MARGIN_PLACES));
    }

    Ok(Forecast::new(projected, method))
}

/// Operating margin: last actual pulled toward the trailing 4Q mean each quarter, plus an
/// operating-leverage term of 0.1x the first projected quarter's revenue growth (needs at
/// least two projected quarters).
pub fn project_operating_margin(
    historical: &HistoricalSeries,
    projected_revenue: Option<&[f64]>,
    n_quarters: usize,
) -> ProjectionResult {
    let revenue = &historical.revenue;
    let opex = &historical.operating_expenses;
    if revenue.is_empty() || opex.is_empty() {
        return Err(Skip::InsufficientData);
    }

    let cost = &historical.cost_of_revenue;
    let has_cogs = !cost.is_empty();

    let margins: Vec<Option<f64>> = revenue
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let r = (*r).filter(|r| *r != 0.0)?;
            let o = opex.get(i).copied().flatten()?;
            match cost.get(i).copied().flatten() {
                Some(c) => Some((r - c - o) / r),
                None => Some(1.0 - o / r),
            }
        })
        .collect();

    let valid: Vec<f64> = margins.iter().flatten().copied().collect();
    let Some(&last_margin) = valid.last() else {
        return Err(Skip::InsufficientData);
    };
    if valid.len() < 2 {
        return Err(Skip::InsufficientData);
    }

    let trailing_mean = trailing_avg(&margins, 4).unwrap_or(last_margin);

    // A single projected quarter carries no leverage term.
    let revenue_growth = projected_revenue
        .filter(|p| p.len() >= 2)
        .and_then(|p| p.first().copied())
        .and_then(|first| safe_div(Some(first), revenue.last().copied().flatten()))
        .map(|ratio| ratio - 1.0)
        .unwrap_or(0.0);
    let leverage = OPERATING_LEVERAGE * revenue_growth;

    let base = if has_cogs {
        "operating income / revenue"
    } else {
        "1 - opex/revenue (no COGS)"
    };
    let mut method = format!(
        "{base}, mean-reverting to trailing avg ({})",
        pct(trailing_mean, 1)
    );
    if revenue_growth != 0.0 {
        method.push_str(&format!(", operating leverage ({}/Q)", signed_pct(leverage, 2)));
    }

    let mut projected = Vec::with_capacity(n_quarters);
    let mut current = last_margin;
    for _ in 0..n_quarters {
        current += (trailing_mean - current) * MEAN_REVERSION_PULL + leverage;
        projected.push(round_to(current, MARGIN_PLACES));
    }

    Ok(Forecast::new(projected, method))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn some(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    fn gross_history(cost: &[f64]) -> HistoricalSeries {
        HistoricalSeries {
            revenue: some(&vec![100.0; cost.len()]),
            cost_of_revenue: some(cost),
            ..Default::default()
        }
    }

    #[test]
    fn gross_margin_without_trend_converges_on_trailing_mean() {
        // Margins .40 .42 .39 .43 .40 .50: no clear trend, trailing mean .43.
        let history = gross_history(&[60.0, 58.0, 61.0, 57.0, 60.0, 50.0]);
        let forecast = project_gross_margin(&history, &Guidance::default(), 8).unwrap();

        assert_eq!(forecast.values.len(), 8);
        assert_eq!(forecast.values[0], 0.5);
        let gaps: Vec<f64> = forecast.values.iter().map(|m| (m - 0.43).abs()).collect();
        assert!(gaps.windows(2).all(|w| w[1] < w[0]), "gaps {gaps:?}");
        assert_eq!(
            forecast.method.as_deref(),
            Some("trailing margin (50.0%) mean-reverting to trailing avg (43.0%)")
        );
    }

    #[test]
    fn gross_margin_starts_at_guidance_midpoint() {
        let history = gross_history(&[60.0, 58.0, 61.0, 57.0, 60.0, 50.0]);
        let guidance = Guidance {
            gross_margin_low: Some(0.44),
            gross_margin_high: Some(0.46),
            ..Default::default()
        };
        let forecast = project_gross_margin(&history, &guidance, 2).unwrap();
        assert_relative_eq!(forecast.values[0], 0.45, epsilon = 1e-12);
        assert_relative_eq!(forecast.values[1], 0.45 + (0.43 - 0.45) * 0.15, epsilon = 1e-4);
        assert!(forecast.method.unwrap().starts_with("guidance midpoint (45.0%)"));

        let low_only = Guidance {
            gross_margin_low: Some(0.44),
            ..Default::default()
        };
        let forecast = project_gross_margin(&history, &low_only, 1).unwrap();
        assert_relative_eq!(forecast.values[0], 0.44, epsilon = 1e-12);
        assert!(forecast.method.unwrap().starts_with("guidance (44.0%)"));
    }

    #[test]
    fn guidance_midpoint_rounds_like_the_stored_value() {
        let history = gross_history(&[60.0, 58.0, 61.0, 57.0, 60.0, 50.0]);
        let guidance = Guidance {
            gross_margin_low: Some(0.2839),
            gross_margin_high: Some(0.284),
            ..Default::default()
        };
        let forecast = project_gross_margin(&history, &guidance, 1).unwrap();
        assert_eq!(forecast.values, vec![0.2839]);
    }

    #[test]
    fn gross_margin_extrapolates_dampened_trend() {
        // Margins .40 .40 .40 .41 .42 .43: rising by a point a quarter.
        let history = gross_history(&[60.0, 60.0, 60.0, 59.0, 58.0, 57.0]);
        let forecast = project_gross_margin(&history, &Guidance::default(), 3).unwrap();

        let mean = (0.40 + 0.41 + 0.42 + 0.43) / 4.0;
        let step1 = 0.43 + (mean - 0.43) * 0.15 + 0.01 * 0.5;
        let step2 = step1 + (mean - step1) * 0.15 + 0.01 * 0.25;
        assert_relative_eq!(forecast.values[1], step1, epsilon = 1e-4);
        assert_relative_eq!(forecast.values[2], step2, epsilon = 1e-4);
        assert!(forecast
            .method
            .unwrap()
            .ends_with(", trend-adjusted (+1.000%/Q with 50% dampening)"));
    }

    #[test]
    fn gross_margin_needs_aligned_history() {
        let mut history = gross_history(&[60.0, 58.0, 61.0]);
        history.cost_of_revenue.pop();
        assert_eq!(
            project_gross_margin(&history, &Guidance::default(), 4),
            Err(Skip::InsufficientData)
        );

        let sparse = HistoricalSeries {
            revenue: vec![Some(100.0), None, Some(0.0)],
            cost_of_revenue: some(&[60.0, 60.0, 60.0]),
            ..Default::default()
        };
        assert_eq!(
            project_gross_margin(&sparse, &Guidance::default(), 4),
            Err(Skip::InsufficientData)
        );
    }

    #[test]
    fn operating_margin_adds_leverage_every_quarter() {
        let history = HistoricalSeries {
            revenue: some(&[100.0, 100.0, 100.0, 100.0]),
            cost_of_revenue: some(&[60.0, 60.0, 60.0, 60.0]),
            operating_expenses: some(&[20.0, 22.0, 18.0, 20.0]),
            ..Default::default()
        };
        let projected_revenue = [104.0, 110.0];
        let forecast = project_operating_margin(&history, Some(&projected_revenue[..]), 2).unwrap();

        assert_relative_eq!(forecast.values[0], 0.204, epsilon = 1e-9);
        assert_relative_eq!(forecast.values[1], 0.2074, epsilon = 1e-9);
        assert_eq!(
            forecast.method.as_deref(),
            Some("operating income / revenue, mean-reverting to trailing avg (20.0%), operating leverage (+0.40%/Q)")
        );
    }

    #[test]
    fn single_projected_quarter_has_no_leverage() {
        let history = HistoricalSeries {
            revenue: some(&[100.0, 100.0, 100.0, 100.0]),
            cost_of_revenue: some(&[60.0, 60.0, 60.0, 60.0]),
            operating_expenses: some(&[20.0, 22.0, 18.0, 20.0]),
            ..Default::default()
        };
        let forecast = project_operating_margin(&history, Some(&[104.0][..]), 1).unwrap();

        assert_relative_eq!(forecast.values[0], 0.2, epsilon = 1e-9);
        assert_eq!(
            forecast.method.as_deref(),
            Some("operating income / revenue, mean-reverting to trailing avg (20.0%)")
        );
    }

    #[test]
    fn operating_margin_degrades_without_cogs_or_revenue_forecast() {
        let history = HistoricalSeries {
            revenue: some(&[100.0, 100.0, 100.0]),
            operating_expenses: some(&[70.0, 70.0, 70.0]),
            ..Default::default()
        };
        let forecast = project_operating_margin(&history, None, 3).unwrap();
        assert_eq!(forecast.values, vec![0.3, 0.3, 0.3]);
        assert_eq!(
            forecast.method.as_deref(),
            Some("1 - opex/revenue (no COGS), mean-reverting to trailing avg (30.0%)")
        );
    }

    #[test]
    fn operating_margin_requires_opex() {
        let history = HistoricalSeries {
            revenue: some(&[100.0, 100.0, 100.0]),
            cost_of_revenue: some(&[60.0, 60.0, 60.0]),
            ..Default::default()
        };
        assert_eq!(
            project_operating_margin(&history, None, 3),
            Err(Skip::InsufficientData)
        );

        let one_point = HistoricalSeries {
            revenue: some(&[100.0, 100.0]),
            operating_expenses: vec![Some(20.0), None],
            ..Default::default()
        };
        assert_eq!(
            project_operating_margin(&one_point, None, 3),
            Err(Skip::InsufficientData)
        );
    }
}
