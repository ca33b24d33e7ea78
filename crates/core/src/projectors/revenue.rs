use crate::describe::pct;
use crate::domain::input::{Guidance, HistoricalSeries, ProjectionParams};
use crate::error::Skip;
use crate::projectors::{Forecast, ProjectionResult};
use crate::series::{compute_seasonal_pattern, round_to, trailing_vals, yoy_growth_rates};

const QUARTERS_PER_YEAR: usize = 4;

/// Growth rate at 1-indexed horizon `step`, decaying geometrically from `initial` to `long_term`.
pub fn blended_growth(initial: f64, long_term: f64, decay: f64, step: usize) -> f64 {
    let weight = decay.powi(step as i32);
    initial * weight + long_term * (1.0 - weight)
}

/// Seasonally split revenue forecast.
///
/// The initial growth rate comes from guidance, else the latest YoY rate, else the long-term
/// rate. Each forecast year's annual base is the trailing four quarters (first year) or the
/// previous forecast year's total, grown by the step's blended rate and split by the
/// trailing seasonal shares.
pub fn project_revenue(
    historical: &HistoricalSeries,
    guidance: &Guidance,
    params: &ProjectionParams,
) -> ProjectionResult {
    let revenue = &historical.revenue;
    if revenue.len() < QUARTERS_PER_YEAR || revenue.iter().all(Option::is_none) {
        return Err(Skip::InsufficientData);
    }

    let long_term = params.long_term_growth;
    let seasonal = compute_seasonal_pattern(revenue, QUARTERS_PER_YEAR);

    let (initial_growth, method) = match (guidance.revenue_growth, yoy_growth_rates(revenue).last()) {
        (Some(g), _) => (
            g,
            format!(
                "guidance growth ({}) + geometric decay to {} LT growth, seasonal adjustment",
                pct(g, 1),
                pct(long_term, 0)
            ),
        ),
        (None, Some(&yoy)) => (
            yoy,
            format!(
                "trailing YoY growth ({}) + geometric decay to {} LT growth, seasonal adjustment",
                pct(yoy, 1),
                pct(long_term, 0)
            ),
        ),
        (None, None) => (
            long_term,
            format!("long-term growth ({}), seasonal adjustment", pct(long_term, 0)),
        ),
    };

    let trailing_annual: f64 = trailing_vals(revenue, QUARTERS_PER_YEAR).iter().sum();

    let mut projected: Vec<f64> = Vec::with_capacity(params.n_quarters);
    for t in 0..params.n_quarters {
        let growth = blended_growth(initial_growth, long_term, params.decay_factor, t + 1);

        let year = t / QUARTERS_PER_YEAR;
        let base_annual = if year == 0 {
            trailing_annual
        } else {
            projected[(year - 1) * QUARTERS_PER_YEAR..year * QUARTERS_PER_YEAR]
                .iter()
                .sum()
        };

        let quarterly = base_annual * (1.0 + growth) * seasonal[t % QUARTERS_PER_YEAR];
        projected.push(round_to(quarterly, 0));
    }

    Ok(Forecast::new(projected, method))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn historical(values: &[f64]) -> HistoricalSeries {
        HistoricalSeries {
            revenue: values.iter().copied().map(Some).collect(),
            ..Default::default()
        }
    }

    fn params(n_quarters: usize) -> ProjectionParams {
        ProjectionParams {
            n_quarters,
            long_term_growth: 0.03,
            decay_factor: 0.85,
        }
    }

    const RAMP: [f64; 8] = [100.0, 105.0, 110.0, 115.0, 120.0, 125.0, 130.0, 135.0];

    #[test]
    fn first_step_blends_guidance_toward_long_term() {
        assert_relative_eq!(blended_growth(0.08, 0.03, 0.85, 1), 0.0725, epsilon = 1e-12);
        assert_relative_eq!(
            blended_growth(0.08, 0.03, 0.85, 2),
            0.08 * 0.7225 + 0.03 * 0.2775,
            epsilon = 1e-12
        );
        // Far out the rate converges on the long-term rate.
        assert_relative_eq!(blended_growth(0.5, 0.03, 0.85, 200), 0.03, epsilon = 1e-9);
    }

    #[test]
    fn guidance_drives_first_forecast_year() {
        let guidance = Guidance {
            revenue_growth: Some(0.08),
            ..Default::default()
        };
        let forecast = project_revenue(&historical(&RAMP), &guidance, &params(4)).unwrap();

        assert_eq!(forecast.values.len(), 4);
        // Trailing annual 510 grown by 7.25%, Q1 share 120/510.
        assert_eq!(forecast.values[0], (510.0_f64 * 1.0725 * 120.0 / 510.0).round());
        assert_eq!(
            forecast.method.as_deref(),
            Some("guidance growth (8.0%) + geometric decay to 3% LT growth, seasonal adjustment")
        );
    }

    #[test]
    fn chains_forecast_years() {
        let forecast = project_revenue(&historical(&RAMP), &Guidance::default(), &params(8)).unwrap();
        assert_eq!(forecast.values.len(), 8);

        let first_year: f64 = forecast.values[..4].iter().sum();
        let growth = blended_growth(135.0 / 115.0 - 1.0, 0.03, 0.85, 5);
        let expected = (first_year * (1.0 + growth) * (120.0 / 510.0)).round_ties_even();
        assert_eq!(forecast.values[4], expected);
        assert!(forecast
            .method
            .unwrap()
            .starts_with("trailing YoY growth (17.4%)"));
    }

    #[test]
    fn falls_back_to_long_term_growth_without_yoy_history() {
        let forecast =
            project_revenue(&historical(&[100.0, 100.0, 100.0, 100.0]), &Guidance::default(), &params(2))
                .unwrap();
        assert_eq!(forecast.values, vec![103.0, 103.0]);
        assert_eq!(forecast.method.as_deref(), Some("long-term growth (3%), seasonal adjustment"));
    }

    #[test]
    fn horizon_length_matches_request() {
        for n in [0, 1, 5, 12] {
            let forecast = project_revenue(&historical(&RAMP[..5]), &Guidance::default(), &params(n)).unwrap();
            assert_eq!(forecast.values.len(), n);
        }
    }

    #[test]
    fn short_history_is_insufficient() {
        assert_eq!(
            project_revenue(&historical(&[100.0, 105.0]), &Guidance::default(), &params(4)),
            Err(Skip::InsufficientData)
        );
        let gaps = HistoricalSeries {
            revenue: vec![None; 6],
            ..Default::default()
        };
        assert_eq!(
            project_revenue(&gaps, &Guidance::default(), &params(4)),
            Err(Skip::InsufficientData)
        );
    }
}
