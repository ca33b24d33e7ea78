use crate::compose;
use crate::config::{ProjectionDefaults, MAX_PROJECTION_QUARTERS};
use crate::domain::input::{Guidance, HistoricalSeries, ProjectionInput, ProjectionParams};
use crate::domain::metric::{evaluation_order, Metric};
use crate::domain::output::{Assumptions, OutputDocument, Projections, SeriesValues};
use crate::error::{EngineError, Skip};
use crate::projectors::{self, Forecast, ProjectionResult};
use crate::time::advance_periods;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Runs every projector in dependency order and assembles the output document.
///
/// Only missing or malformed historical periods and an out-of-range horizon are fatal; any
/// metric that cannot be projected is left out together with the metrics that require it.
pub fn run_projection(
    input: &ProjectionInput,
    defaults: &ProjectionDefaults,
    generated_at: NaiveDate,
) -> Result<OutputDocument, EngineError> {
    let historical = &input.historical;
    let last_period = historical
        .periods
        .last()
        .ok_or(EngineError::MissingPeriods)?;

    let params = input.params(defaults);
    if !(1..=MAX_PROJECTION_QUARTERS).contains(&params.n_quarters) {
        return Err(EngineError::InvalidHorizon {
            requested: params.n_quarters,
            max: MAX_PROJECTION_QUARTERS,
        });
    }
    let periods = advance_periods(last_period, params.n_quarters)?;

    for (series, len) in historical.misaligned() {
        tracing::warn!(
            series,
            len,
            periods = historical.periods.len(),
            "historical series length differs from periods"
        );
    }

    let guidance = input.guidance();
    let engine = Engine {
        historical,
        guidance: &guidance,
        params,
    };
    let forecasts = engine.project_all()?;

    let methods = forecasts
        .iter()
        .filter_map(|(metric, forecast)| Some((*metric, forecast.method.clone()?)))
        .collect();
    let series = forecasts
        .iter()
        .map(|(metric, forecast)| (*metric, SeriesValues::for_metric(*metric, &forecast.values)))
        .collect();

    Ok(OutputDocument {
        ticker: input.ticker().to_string(),
        generated_at,
        projection_quarters: params.n_quarters,
        assumptions: Assumptions {
            long_term_growth: params.long_term_growth,
            decay_factor: params.decay_factor,
            methods,
        },
        projections: Projections { periods, series },
    })
}

struct Engine<'a> {
    historical: &'a HistoricalSeries,
    guidance: &'a Guidance,
    params: ProjectionParams,
}

impl Engine<'_> {
    fn project_all(&self) -> Result<BTreeMap<Metric, Forecast>, EngineError> {
        let mut forecasts = BTreeMap::new();

        for metric in evaluation_order()? {
            let outcome = match metric.requires().iter().find(|dep| !forecasts.contains_key(*dep)) {
                Some(dep) => Err(Skip::MissingInput(*dep)),
                None => self
                    .project(metric, &forecasts)
                    .and_then(|forecast| self.check_horizon(metric, forecast)),
            };

            match outcome {
                Ok(forecast) => {
                    tracing::debug!(
                        %metric,
                        method = forecast.method.as_deref().unwrap_or("derived"),
                        "metric projected"
                    );
                    forecasts.insert(metric, forecast);
                }
                Err(skip) => {
                    tracing::debug!(%metric, reason = %skip, "metric skipped");
                }
            }
        }

        Ok(forecasts)
    }

    fn project(&self, metric: Metric, forecasts: &BTreeMap<Metric, Forecast>) -> ProjectionResult {
        let values = |m: Metric| forecasts.get(&m).map(|f| f.values.as_slice());
        let required = |m: Metric| values(m).ok_or(Skip::MissingInput(m));

        let (historical, guidance) = (self.historical, self.guidance);
        let n = self.params.n_quarters;

        match metric {
            Metric::Revenue => projectors::project_revenue(historical, guidance, &self.params),
            Metric::GrossMargin => projectors::project_gross_margin(historical, guidance, n),
            Metric::GrossProfit => {
                compose::gross_profit(required(Metric::Revenue)?, required(Metric::GrossMargin)?)
            }
            Metric::OperatingMargin => {
                projectors::project_operating_margin(historical, values(Metric::Revenue), n)
            }
            Metric::OperatingIncome => compose::operating_income(
                required(Metric::Revenue)?,
                required(Metric::OperatingMargin)?,
            ),
            Metric::Capex => {
                projectors::project_capex(historical, guidance, values(Metric::Revenue), n)
            }
            Metric::Depreciation => {
                projectors::project_depreciation(historical, values(Metric::Revenue), n)
            }
            Metric::TaxRate => projectors::project_tax_rate(historical, guidance, n),
            Metric::SharesOutstanding => projectors::project_shares(historical, n),
            Metric::NetIncome => compose::net_income(
                required(Metric::OperatingIncome)?,
                required(Metric::TaxRate)?,
            ),
            Metric::NetMargin => {
                compose::net_margin(required(Metric::NetIncome)?, required(Metric::Revenue)?)
            }
            Metric::Eps => compose::eps(
                required(Metric::NetIncome)?,
                required(Metric::SharesOutstanding)?,
            ),
            Metric::Fcf => compose::free_cash_flow(
                required(Metric::NetIncome)?,
                values(Metric::Depreciation),
                values(Metric::Capex),
            ),
        }
    }

    fn check_horizon(&self, metric: Metric, forecast: Forecast) -> ProjectionResult {
        if forecast.values.len() != self.params.n_quarters {
            tracing::warn!(
                %metric,
                len = forecast.values.len(),
                expected = self.params.n_quarters,
                "forecast length does not match horizon"
            );
            return Err(Skip::InsufficientData);
        }
        if forecast.values.iter().any(|v| !v.is_finite()) {
            tracing::warn!(%metric, "forecast contains non-finite values");
            return Err(Skip::InsufficientData);
        }
        Ok(forecast)
    }
}
