use crate::describe::pct;
use crate::domain::input::{Guidance, HistoricalSeries};
use crate::error::Skip;
use crate::projectors::{Forecast, ProjectionResult};
use crate::series::{round_to, tail_mean};

/// Effective rates outside this open interval are treated as noise.
const SANE_RATE: (f64, f64) = (0.0, 0.5);

/// `1 - net_income / (revenue - cost - opex)` per period, keeping only plausible rates.
fn effective_rates(historical: &HistoricalSeries) -> Vec<f64> {
    let at = |series: &[Option<f64>], i: usize| series.get(i).copied().flatten();

    (0..historical.net_income.len())
        .filter_map(|i| {
            let revenue = at(&historical.revenue, i).filter(|r| *r != 0.0)?;
            let net_income = at(&historical.net_income, i)?;
            let cost = at(&historical.cost_of_revenue, i)?;
            let opex = at(&historical.operating_expenses, i)?;

            let pretax = revenue - cost - opex;
            if pretax <= 0.0 || net_income <= 0.0 {
                return None;
            }
            let rate = 1.0 - net_income / pretax;
            (rate > SANE_RATE.0 && rate < SANE_RATE.1).then_some(rate)
        })
        .collect()
}

/// Flat tax rate: guidance when given, else the trailing effective rate.
pub fn project_tax_rate(
    historical: &HistoricalSeries,
    guidance: &Guidance,
    n_quarters: usize,
) -> ProjectionResult {
    if let Some(rate) = guidance.tax_rate {
        return Ok(Forecast::new(
            vec![rate; n_quarters],
            format!("guidance tax rate ({})", pct(rate, 1)),
        ));
    }

    if historical.net_income.is_empty() || historical.revenue.is_empty() {
        return Err(Skip::InsufficientData);
    }

    let rate = tail_mean(&effective_rates(historical), 4).ok_or(Skip::InsufficientData)?;
    Ok(Forecast::new(
        vec![round_to(rate, 4); n_quarters],
        format!("trailing effective tax rate ({})", pct(rate, 1)),
    ))
}
