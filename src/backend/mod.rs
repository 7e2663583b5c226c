//! Native query backends for filter push-down.

pub mod sql_filter;

pub use sql_filter::{SqlExpression, SqlTranslator};
