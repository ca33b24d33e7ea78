use crate::describe::pct;
use crate::domain::input::HistoricalSeries;
use crate::error::Skip;
use crate::projectors::{Forecast, ProjectionResult};
use crate::series::{coefficient_of_variation, round_to, safe_div, tail_mean};

/// Period-by-period `depreciation / base`, keeping only computable ratios.
fn ratios(depreciation: &[Option<f64>], base: &[Option<f64>]) -> Vec<f64> {
    depreciation
        .iter()
        .zip(base)
        .filter_map(|(d, b)| safe_div(*d, *b))
        .collect()
}

/// D&A as a trailing share of PP&E or of revenue, whichever ratio has been more stable.
///
/// The PP&E path holds PP&E at its last reported value.
pub fn project_depreciation(
    historical: &HistoricalSeries,
    projected_revenue: Option<&[f64]>,
    n_quarters: usize,
) -> ProjectionResult {
    let depreciation = &historical.depreciation;
    if depreciation.is_empty() {
        return Err(Skip::InsufficientData);
    }

    let ppe_ratios = ratios(depreciation, &historical.pp_and_e);
    let revenue_ratios = ratios(depreciation, &historical.revenue);

    let use_ppe = match (ppe_ratios.is_empty(), revenue_ratios.is_empty()) {
        (false, false) => {
            coefficient_of_variation(&ppe_ratios) < coefficient_of_variation(&revenue_ratios)
        }
        (false, true) => true,
        _ => false,
    };

    if use_ppe {
        let ratio = tail_mean(&ppe_ratios, 4).ok_or(Skip::InsufficientData)?;
        let last_ppe = historical
            .pp_and_e
            .iter()
            .rev()
            .find_map(|v| *v)
            .ok_or(Skip::InsufficientData)?;
        let value = round_to(last_ppe * ratio, 0);
        return Ok(Forecast::new(
            vec![value; n_quarters],
            format!("D&A as % of PP&E ({}), trailing avg", pct(ratio, 1)),
        ));
    }

    let Some(projected_revenue) = projected_revenue else {
        return Err(Skip::InsufficientData);
    };
    let ratio = tail_mean(&revenue_ratios, 4).ok_or(Skip::InsufficientData)?;
    if projected_revenue.len() < n_quarters {
        return Err(Skip::InsufficientData);
    }

    let projected = projected_revenue[..n_quarters]
        .iter()
        .map(|revenue| round_to(revenue * ratio, 0))
        .collect();

    Ok(Forecast::new(
        projected,
        format!("D&A as % of revenue ({}), trailing avg", pct(ratio, 1)),
    ))
}
