use crate::describe::{pct, thousands};
use crate::domain::input::{Guidance, HistoricalSeries};
use crate::error::Skip;
use crate::projectors::{Forecast, ProjectionResult};
use crate::series::{compute_seasonal_pattern, round_to, safe_div, trailing_vals};

const GUIDED_QUARTERS: usize = 4;

/// Trailing 4Q capex over trailing 4Q revenue, when both histories cover a year.
fn trailing_capex_ratio(historical: &HistoricalSeries) -> Option<f64> {
    let (capex, revenue) = (&historical.capex, &historical.revenue);
    if capex.len() < 4 || revenue.len() < 4 {
        return None;
    }
    let capex_total: f64 = trailing_vals(capex, 4).iter().sum();
    let revenue_total: f64 = trailing_vals(revenue, 4).iter().sum();
    safe_div(Some(capex_total), Some(revenue_total))
}

/// Capital expenditure from the guided annual range for the first year, otherwise (and
/// afterwards) as a trailing share of projected revenue.
pub fn project_capex(
    historical: &HistoricalSeries,
    guidance: &Guidance,
    projected_revenue: Option<&[f64]>,
    n_quarters: usize,
) -> ProjectionResult {
    if let Some((low, high)) = guidance.capex_bounds() {
        return Ok(guided_capex(historical, low, high, projected_revenue, n_quarters));
    }

    let projected_revenue = projected_revenue.ok_or(Skip::InsufficientData)?;
    if historical.capex.is_empty() || projected_revenue.len() < n_quarters {
        return Err(Skip::InsufficientData);
    }
    let ratio = trailing_capex_ratio(historical).ok_or(Skip::InsufficientData)?;

    let projected = projected_revenue[..n_quarters]
        .iter()
        .map(|revenue| round_to(revenue * ratio, 0))
        .collect();

    Ok(Forecast::new(
        projected,
        format!(
            "trailing CapEx/Revenue ratio ({}) applied to projected revenue",
            pct(ratio, 1)
        ),
    ))
}

fn guided_capex(
    historical: &HistoricalSeries,
    low: f64,
    high: f64,
    projected_revenue: Option<&[f64]>,
    n_quarters: usize,
) -> Forecast {
    let annual = (low + high) / 2.0;

    let seasonal = if historical.capex.len() >= GUIDED_QUARTERS {
        compute_seasonal_pattern(&historical.capex, GUIDED_QUARTERS)
    } else {
        vec![1.0 / GUIDED_QUARTERS as f64; GUIDED_QUARTERS]
    };

    let ratio = projected_revenue.and(trailing_capex_ratio(historical));

    let projected = (0..n_quarters)
        .map(|t| {
            if t < GUIDED_QUARTERS {
                return round_to(annual * seasonal[t], 0);
            }
            let revenue = projected_revenue.and_then(|p| p.get(t).copied());
            match (ratio, revenue) {
                (Some(ratio), Some(revenue)) => round_to(revenue * ratio, 0),
                _ => round_to(annual / GUIDED_QUARTERS as f64, 0),
            }
        })
        .collect();

    Forecast::new(
        projected,
        format!(
            "guidance range ({}-{}) for 4Q, then trailing % of revenue",
            thousands(low),
            thousands(high)
        ),
    )
}
