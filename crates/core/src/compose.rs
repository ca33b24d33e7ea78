//! Metrics derived purely from other forecasts.
//!
//! Inputs are full-horizon arrays of equal length. A zero denominator anywhere in the
//! horizon skips the whole derived metric rather than leaving holes.

use crate::error::Skip;
use crate::projectors::{Forecast, ProjectionResult};
use crate::series::{round_to, safe_div};

fn same_len(a: &[f64], b: &[f64]) -> Result<(), Skip> {
    if a.len() == b.len() {
        Ok(())
    } else {
        Err(Skip::InsufficientData)
    }
}

fn product(a: &[f64], b: &[f64]) -> ProjectionResult {
    same_len(a, b)?;
    Ok(Forecast::derived(
        a.iter().zip(b).map(|(x, y)| round_to(x * y, 0)).collect(),
    ))
}

fn ratio(numerator: &[f64], denominator: &[f64], places: u32) -> ProjectionResult {
    same_len(numerator, denominator)?;
    let values = numerator
        .iter()
        .zip(denominator)
        .map(|(n, d)| safe_div(Some(*n), Some(*d)).map(|v| round_to(v, places)))
        .collect::<Option<Vec<f64>>>()
        .ok_or(Skip::InsufficientData)?;
    Ok(Forecast::derived(values))
}

pub fn gross_profit(revenue: &[f64], gross_margin: &[f64]) -> ProjectionResult {
    product(revenue, gross_margin)
}

pub fn operating_income(revenue: &[f64], operating_margin: &[f64]) -> ProjectionResult {
    product(revenue, operating_margin)
}

pub fn net_income(operating_income: &[f64], tax_rate: &[f64]) -> ProjectionResult {
    same_len(operating_income, tax_rate)?;
    let values = operating_income
        .iter()
        .zip(tax_rate)
        .map(|(income, rate)| round_to(income * (1.0 - rate), 0))
        .collect();
    Ok(Forecast::new(values, "operating income * (1 - tax rate)"))
}

pub fn net_margin(net_income: &[f64], revenue: &[f64]) -> ProjectionResult {
    ratio(net_income, revenue, 4)
}

pub fn eps(net_income: &[f64], shares_outstanding: &[f64]) -> ProjectionResult {
    Ok(ratio(net_income, shares_outstanding, 2)?.with_method("net income / shares outstanding"))
}

/// Net income plus D&A less capex. A missing D&A or capex forecast contributes zero, but at
/// least one of them must be present.
pub fn free_cash_flow(
    net_income: &[f64],
    depreciation: Option<&[f64]>,
    capex: Option<&[f64]>,
) -> ProjectionResult {
    if depreciation.is_none() && capex.is_none() {
        return Err(Skip::InsufficientData);
    }
    for series in [depreciation, capex].into_iter().flatten() {
        same_len(net_income, series)?;
    }

    let at = |series: Option<&[f64]>, i: usize| series.map_or(0.0, |s| s[i]);
    let values = net_income
        .iter()
        .enumerate()
        .map(|(i, income)| round_to(income + at(depreciation, i) - at(capex, i), 0))
        .collect();
    Ok(Forecast::new(values, "net income + depreciation - capex"))
}
