use crate::domain::metric::Metric;
use thiserror::Error;

/// Fatal errors: the run stops before any metric is projected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("historical.periods is required")]
    MissingPeriods,

    #[error("projection_quarters must be between 1 and {max} (got {requested})")]
    InvalidHorizon { requested: usize, max: usize },

    #[error("malformed fiscal period label {0:?} (expected e.g. \"2024Q3\")")]
    MalformedPeriod(String),

    #[error("metric dependency graph has a cycle through {0}")]
    DependencyCycle(Metric),
}

/// Why a single metric was left out of the output. Never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Skip {
    #[error("insufficient data")]
    InsufficientData,

    #[error("missing input: {0}")]
    MissingInput(Metric),
}
