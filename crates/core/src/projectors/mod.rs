//! Per-metric forecasting heuristics.
//!
//! Every projector is a pure function of the historical series, guidance and (for some)
//! the projected revenue. A projector either produces a full horizon or nothing.

pub mod capex;
pub mod depreciation;
pub mod margins;
pub mod revenue;
pub mod shares;
pub mod tax;

use crate::error::Skip;

pub use capex::project_capex;
pub use depreciation::project_depreciation;
pub use margins::{project_gross_margin, project_operating_margin};
pub use revenue::project_revenue;
pub use shares::project_shares;
pub use tax::project_tax_rate;

/// Fraction of the gap to the trailing mean closed each forecast step.
pub const MEAN_REVERSION_PULL: f64 = 0.15;

/// A full-horizon forecast for one metric.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub values: Vec<f64>,
    /// Which heuristic path produced the values; derived metrics may leave this empty.
    pub method: Option<String>,
}

impl Forecast {
    pub fn new(values: Vec<f64>, method: impl Into<String>) -> Self {
        Self {
            values,
            method: Some(method.into()),
        }
    }

    pub fn derived(values: Vec<f64>) -> Self {
        Self {
            values,
            method: None,
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }
}

pub type ProjectionResult = Result<Forecast, Skip>;
