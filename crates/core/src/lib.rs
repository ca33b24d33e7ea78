pub mod compose;
pub mod describe;
pub mod domain;
pub mod engine;
pub mod error;
pub mod projectors;
pub mod series;
pub mod time;

pub use engine::run_projection;
pub use error::{EngineError, Skip};

pub mod config {
    use anyhow::Context;
    use serde::{Deserialize, Serialize};

    pub const DEFAULT_PROJECTION_QUARTERS: usize = 8;
    pub const DEFAULT_LONG_TERM_GROWTH: f64 = 0.03;
    pub const DEFAULT_DECAY_FACTOR: f64 = 0.85;
    /// Ten years of quarters.
    pub const MAX_PROJECTION_QUARTERS: usize = 40;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub sentry_dsn: Option<String>,
        pub projection_quarters: Option<String>,
        pub long_term_growth: Option<String>,
        pub decay_factor: Option<String>,
    }

    /// Horizon and blending parameters used when the input document leaves them out.
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct ProjectionDefaults {
        pub projection_quarters: usize,
        pub long_term_growth: f64,
        pub decay_factor: f64,
    }

    impl Default for ProjectionDefaults {
        fn default() -> Self {
            Self {
                projection_quarters: DEFAULT_PROJECTION_QUARTERS,
                long_term_growth: DEFAULT_LONG_TERM_GROWTH,
                decay_factor: DEFAULT_DECAY_FACTOR,
            }
        }
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                projection_quarters: std::env::var("PROJECTION_QUARTERS").ok(),
                long_term_growth: std::env::var("PROJECTION_LONG_TERM_GROWTH").ok(),
                decay_factor: std::env::var("PROJECTION_DECAY_FACTOR").ok(),
            })
        }

        pub fn projection_defaults(&self) -> anyhow::Result<ProjectionDefaults> {
            let mut defaults = ProjectionDefaults::default();

            if let Some(s) = non_empty(self.projection_quarters.as_deref()) {
                let quarters = s
                    .parse::<usize>()
                    .with_context(|| format!("PROJECTION_QUARTERS is not an integer: {s}"))?;
                anyhow::ensure!(
                    (1..=MAX_PROJECTION_QUARTERS).contains(&quarters),
                    "PROJECTION_QUARTERS must be between 1 and {MAX_PROJECTION_QUARTERS} (got {quarters})"
                );
                defaults.projection_quarters = quarters;
            }

            if let Some(s) = non_empty(self.long_term_growth.as_deref()) {
                let growth = s
                    .parse::<f64>()
                    .with_context(|| format!("PROJECTION_LONG_TERM_GROWTH is not a number: {s}"))?;
                anyhow::ensure!(
                    growth.is_finite(),
                    "PROJECTION_LONG_TERM_GROWTH must be finite (got {growth})"
                );
                defaults.long_term_growth = growth;
            }

            if let Some(s) = non_empty(self.decay_factor.as_deref()) {
                let decay = s
                    .parse::<f64>()
                    .with_context(|| format!("PROJECTION_DECAY_FACTOR is not a number: {s}"))?;
                anyhow::ensure!(
                    decay > 0.0 && decay < 1.0,
                    "PROJECTION_DECAY_FACTOR must be between 0 and 1, exclusive (got {decay})"
                );
                defaults.decay_factor = decay;
            }

            Ok(defaults)
        }
    }

    fn non_empty(value: Option<&str>) -> Option<&str> {
        value.map(str::trim).filter(|s| !s.is_empty())
    }

}
