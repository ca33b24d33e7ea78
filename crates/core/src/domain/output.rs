use crate::domain::metric::{Metric, Unit};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything one run produces. Renderers read `projections[<metric>]` as a plain array
/// aligned to `projections.periods`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDocument {
    pub ticker: String,
    pub generated_at: NaiveDate,
    pub projection_quarters: usize,
    pub assumptions: Assumptions,
    pub projections: Projections,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assumptions {
    pub long_term_growth: f64,
    pub decay_factor: f64,
    pub methods: BTreeMap<Metric, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projections {
    pub periods: Vec<String>,
    #[serde(flatten)]
    pub series: BTreeMap<Metric, SeriesValues>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeriesValues {
    Whole(Vec<i64>),
    Fractional(Vec<f64>),
}

impl SeriesValues {
    /// Values are expected to be rounded already; amounts are only re-typed.
    pub fn for_metric(metric: Metric, values: &[f64]) -> Self {
        match metric.unit() {
            Unit::Amount => SeriesValues::Whole(values.iter().map(|v| *v as i64).collect()),
            Unit::Ratio | Unit::PerShare => SeriesValues::Fractional(values.to_vec()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SeriesValues::Whole(v) => v.len(),
            SeriesValues::Fractional(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_f64(&self) -> Vec<f64> {
        match self {
            SeriesValues::Whole(v) => v.iter().map(|x| *x as f64).collect(),
            SeriesValues::Fractional(v) => v.clone(),
        }
    }
}

impl OutputDocument {
    pub fn series(&self, metric: Metric) -> Option<&SeriesValues> {
        self.projections.series.get(&metric)
    }

    pub fn method(&self, metric: Metric) -> Option<&str> {
        self.assumptions.methods.get(&metric).map(String::as_str)
    }
}
