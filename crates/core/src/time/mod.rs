pub mod fiscal_quarter;

pub use fiscal_quarter::{advance_periods, FiscalQuarter};
