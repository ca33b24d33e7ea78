use crate::config::ProjectionDefaults;
use serde::{Deserialize, Deserializer, Serialize};

/// One value per historical period; `None` marks a period with no reported value.
pub type Series = Vec<Option<f64>>;

/// The document handed over by the market-data side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectionInput {
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub projection_quarters: Option<usize>,
    #[serde(default)]
    pub long_term_growth: Option<f64>,
    #[serde(default)]
    pub decay_factor: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub historical: HistoricalSeries,
    #[serde(default)]
    pub guidance: Option<Guidance>,
}

/// Quarterly fundamentals, index-aligned to `periods`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoricalSeries {
    #[serde(default, deserialize_with = "null_as_default")]
    pub periods: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub revenue: Series,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cost_of_revenue: Series,
    #[serde(default, deserialize_with = "null_as_default")]
    pub operating_expenses: Series,
    #[serde(default, deserialize_with = "null_as_default")]
    pub capex: Series,
    #[serde(default, deserialize_with = "null_as_default")]
    pub depreciation: Series,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pp_and_e: Series,
    #[serde(default, deserialize_with = "null_as_default")]
    pub net_income: Series,
    #[serde(default, deserialize_with = "null_as_default")]
    pub shares_outstanding: Series,
}

/// Company-issued forward targets. Any subset may be present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Guidance {
    #[serde(default)]
    pub revenue_growth: Option<f64>,
    #[serde(default)]
    pub gross_margin_low: Option<f64>,
    #[serde(default)]
    pub gross_margin_high: Option<f64>,
    #[serde(default)]
    pub capex_range: Option<Vec<f64>>,
    #[serde(default)]
    pub tax_rate: Option<f64>,
}

/// Horizon and blending parameters for a single run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionParams {
    pub n_quarters: usize,
    pub long_term_growth: f64,
    pub decay_factor: f64,
}

impl ProjectionInput {
    pub fn ticker(&self) -> &str {
        self.ticker
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("UNKNOWN")
    }

    pub fn params(&self, defaults: &ProjectionDefaults) -> ProjectionParams {
        ProjectionParams {
            n_quarters: self
                .projection_quarters
                .unwrap_or(defaults.projection_quarters),
            long_term_growth: self.long_term_growth.unwrap_or(defaults.long_term_growth),
            decay_factor: self.decay_factor.unwrap_or(defaults.decay_factor),
        }
    }

    pub fn guidance(&self) -> Guidance {
        self.guidance.clone().unwrap_or_default()
    }
}

impl HistoricalSeries {
    /// Named series whose length differs from `periods` (name, length).
    pub fn misaligned(&self) -> Vec<(&'static str, usize)> {
        let expected = self.periods.len();
        [
            ("revenue", &self.revenue),
            ("cost_of_revenue", &self.cost_of_revenue),
            ("operating_expenses", &self.operating_expenses),
            ("capex", &self.capex),
            ("depreciation", &self.depreciation),
            ("pp_and_e", &self.pp_and_e),
            ("net_income", &self.net_income),
            ("shares_outstanding", &self.shares_outstanding),
        ]
        .into_iter()
        .filter(|(_, series)| !series.is_empty() && series.len() != expected)
        .map(|(name, series)| (name, series.len()))
        .collect()
    }
}

impl Guidance {
    /// Low/high annual capex guidance; ignored unless exactly two bounds are given.
    pub fn capex_bounds(&self) -> Option<(f64, f64)> {
        match self.capex_range.as_deref() {
            Some([low, high]) => Some((*low, *high)),
            Some(other) => {
                tracing::warn!(len = other.len(), "ignoring capex_range without exactly two bounds");
                None
            }
            None => None,
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_sparse_document_with_nulls() {
        let input: ProjectionInput = serde_json::from_value(json!({
            "ticker": "ACME",
            "historical": {
                "periods": ["2024Q1", "2024Q2"],
                "revenue": [100.0, null],
                "capex": null,
            },
            "guidance": {"tax_rate": 0.21},
        }))
        .unwrap();

        assert_eq!(input.ticker(), "ACME");
        assert_eq!(input.historical.revenue, vec![Some(100.0), None]);
        assert!(input.historical.capex.is_empty());
        assert_eq!(input.guidance().tax_rate, Some(0.21));
        assert_eq!(input.guidance().revenue_growth, None);
    }

    #[test]
    fn applies_defaults_for_missing_parameters() {
        let input: ProjectionInput =
            serde_json::from_value(json!({"decay_factor": 0.5, "historical": null})).unwrap();
        let params = input.params(&ProjectionDefaults::default());
        assert_eq!(params.n_quarters, 8);
        assert_eq!(params.long_term_growth, 0.03);
        assert_eq!(params.decay_factor, 0.5);
        assert_eq!(input.ticker(), "UNKNOWN");
        assert!(input.historical.periods.is_empty());
    }

    #[test]
    fn capex_bounds_require_two_values() {
        let mut guidance = Guidance {
            capex_range: Some(vec![1000.0, 1200.0]),
            ..Default::default()
        };
        assert_eq!(guidance.capex_bounds(), Some((1000.0, 1200.0)));

        guidance.capex_range = Some(vec![1000.0]);
        assert_eq!(guidance.capex_bounds(), None);
    }

    #[test]
    fn reports_misaligned_series() {
        let historical = HistoricalSeries {
            periods: vec!["2024Q1".into(), "2024Q2".into()],
            revenue: vec![Some(1.0), Some(2.0)],
            capex: vec![Some(1.0)],
            ..Default::default()
        };
        assert_eq!(historical.misaligned(), vec![("capex", 1)]);
    }
}
