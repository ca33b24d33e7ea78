pub mod input;
pub mod metric;
pub mod output;
