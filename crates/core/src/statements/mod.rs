//! Financial statements.
//!
//! Income statement, balance sheet and cash flow rendered in PCG or IFRS
//! presentation from consolidated line items. Statements are read
//! projections and are never stored.
//!
//! # Modules
//!
//! - `types` - Statement type, format, period and line types
//! - `period` - Trimester slicing
//! - `builder` - Rendering
//! - `cache` - Moka cache keyed by consolidation fingerprint

pub mod builder;
pub mod cache;
pub mod error;
pub mod period;
pub mod types;

#[cfg(test)]
mod builder_props;

pub use builder::StatementBuilder;
pub use cache::{StatementCache, StatementKey};
pub use error::StatementError;
pub use types::{
    BalanceCheck, FinancialStatement, StatementFormat, StatementLine, StatementPeriod,
    StatementType,
};
