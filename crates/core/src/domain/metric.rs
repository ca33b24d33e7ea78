use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Every series the engine can emit.
///
/// Variants are declared in evaluation order; `Ord` follows declaration order, which is
/// also the key order of the output maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Revenue,
    GrossMargin,
    GrossProfit,
    OperatingMargin,
    OperatingIncome,
    Capex,
    Depreciation,
    TaxRate,
    SharesOutstanding,
    NetIncome,
    NetMargin,
    Eps,
    Fcf,
}

/// How a metric's values are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    /// Currency amounts and share counts, emitted as integers.
    Amount,
    /// Fractions such as margins and tax rates.
    Ratio,
    PerShare,
}

impl Metric {
    pub const ALL: [Metric; 13] = [
        Metric::Revenue,
        Metric::GrossMargin,
        Metric::GrossProfit,
        Metric::OperatingMargin,
        Metric::OperatingIncome,
        Metric::Capex,
        Metric::Depreciation,
        Metric::TaxRate,
        Metric::SharesOutstanding,
        Metric::NetIncome,
        Metric::NetMargin,
        Metric::Eps,
        Metric::Fcf,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Revenue => "revenue",
            Metric::GrossMargin => "gross_margin",
            Metric::GrossProfit => "gross_profit",
            Metric::OperatingMargin => "operating_margin",
            Metric::OperatingIncome => "operating_income",
            Metric::Capex => "capex",
            Metric::Depreciation => "depreciation",
            Metric::TaxRate => "tax_rate",
            Metric::SharesOutstanding => "shares_outstanding",
            Metric::NetIncome => "net_income",
            Metric::NetMargin => "net_margin",
            Metric::Eps => "eps",
            Metric::Fcf => "fcf",
        }
    }

    pub fn unit(self) -> Unit {
        match self {
            Metric::GrossMargin | Metric::OperatingMargin | Metric::TaxRate | Metric::NetMargin => {
                Unit::Ratio
            }
            Metric::Eps => Unit::PerShare,
            _ => Unit::Amount,
        }
    }

    /// Metrics that must have been projected for this one to be computed at all.
    pub fn requires(self) -> &'static [Metric] {
        match self {
            Metric::GrossProfit => &[Metric::Revenue, Metric::GrossMargin],
            Metric::OperatingIncome => &[Metric::Revenue, Metric::OperatingMargin],
            Metric::NetIncome => &[Metric::OperatingIncome, Metric::TaxRate],
            Metric::NetMargin => &[Metric::NetIncome, Metric::Revenue],
            Metric::Eps => &[Metric::NetIncome, Metric::SharesOutstanding],
            Metric::Fcf => &[Metric::NetIncome],
            _ => &[],
        }
    }

    /// Metrics consumed when present; their absence changes the method, not the outcome.
    pub fn uses(self) -> &'static [Metric] {
        match self {
            Metric::OperatingMargin | Metric::Capex | Metric::Depreciation => &[Metric::Revenue],
            Metric::Fcf => &[Metric::Depreciation, Metric::Capex],
            _ => &[],
        }
    }

    fn inputs(self) -> impl Iterator<Item = Metric> {
        self.requires().iter().chain(self.uses()).copied()
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Topological order over [`Metric::ALL`], ties broken by declaration order.
pub fn evaluation_order() -> Result<Vec<Metric>, EngineError> {
    order_metrics(&Metric::ALL, Metric::inputs)
}

fn order_metrics<I>(
    metrics: &[Metric],
    inputs: impl Fn(Metric) -> I,
) -> Result<Vec<Metric>, EngineError>
where
    I: Iterator<Item = Metric>,
{
    let mut done = BTreeSet::new();
    let mut order = Vec::with_capacity(metrics.len());

    while order.len() < metrics.len() {
        // Inputs outside the evaluated set are treated as never available, not as blockers.
        let next = metrics.iter().copied().find(|m| {
            !done.contains(m) && inputs(*m).all(|dep| done.contains(&dep) || !metrics.contains(&dep))
        });

        match next {
            Some(metric) => {
                done.insert(metric);
                order.push(metric);
            }
            None => {
                let stuck = metrics
                    .iter()
                    .copied()
                    .find(|m| !done.contains(m))
                    .unwrap_or(Metric::Revenue);
                return Err(EngineError::DependencyCycle(stuck));
            }
        }
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_input_precedes_its_dependent() {
        let order = evaluation_order().unwrap();
        assert_eq!(order.len(), Metric::ALL.len());
        for (idx, metric) in order.iter().enumerate() {
            for dep in metric.inputs() {
                let dep_idx = order.iter().position(|m| *m == dep).unwrap();
                assert!(dep_idx < idx, "{dep} must come before {metric}");
            }
        }
    }

    #[test]
    fn declaration_order_is_already_topological() {
        assert_eq!(evaluation_order().unwrap(), Metric::ALL.to_vec());
    }

    #[test]
    fn reports_cycles() {
        let cyclic = |m: Metric| -> std::vec::IntoIter<Metric> {
            match m {
                Metric::Revenue => vec![Metric::Capex].into_iter(),
                Metric::Capex => vec![Metric::Revenue].into_iter(),
                _ => Vec::new().into_iter(),
            }
        };
        let err = order_metrics(&[Metric::Revenue, Metric::Capex], cyclic).unwrap_err();
        assert_eq!(err, EngineError::DependencyCycle(Metric::Revenue));
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Metric::SharesOutstanding).unwrap(), "\"shares_outstanding\"");
        assert_eq!(Metric::Fcf.to_string(), "fcf");
        assert_eq!(Metric::Eps.unit(), Unit::PerShare);
        assert_eq!(Metric::TaxRate.unit(), Unit::Ratio);
        assert_eq!(Metric::Revenue.unit(), Unit::Amount);
    }
}
