use crate::describe::signed_pct;
use crate::domain::input::HistoricalSeries;
use crate::error::Skip;
use crate::projectors::{Forecast, ProjectionResult};
use crate::series::{qoq_growth_rates, round_to, tail_mean};

/// Compounds the trailing average quarterly change in share count (buybacks or dilution).
pub fn project_shares(historical: &HistoricalSeries, n_quarters: usize) -> ProjectionResult {
    let reported: Vec<Option<f64>> = historical
        .shares_outstanding
        .iter()
        .filter(|v| v.is_some())
        .copied()
        .collect();
    let Some(&Some(last)) = reported.last() else {
        return Err(Skip::InsufficientData);
    };
    if reported.len() < 2 {
        return Err(Skip::InsufficientData);
    }

    let rate = tail_mean(&qoq_growth_rates(&reported), 4).ok_or(Skip::InsufficientData)?;

    let mut current = last;
    let projected = (0..n_quarters)
        .map(|_| {
            current *= 1.0 + rate;
            round_to(current, 0)
        })
        .collect();

    let direction = if rate < 0.0 { "buyback" } else { "dilution" };
    Ok(Forecast::new(
        projected,
        format!(
            "trailing QoQ {direction} rate ({}/Q)",
            signed_pct(rate, 3)
        ),
    ))
}
