//! Budget consolidation.
//!
//! Pulls normalized records from the six planning modules, maps them onto
//! PCG accounts and consolidation categories, and replaces the version's
//! line items in one atomic step.
//!
//! # Modules
//!
//! - `types` - Line items, totals, status and validation types
//! - `mapping` - Account-code to category table
//! - `engine` - Pure aggregation and fingerprinting
//! - `service` - Locked consolidate, status, validation and statements

pub mod engine;
pub mod error;
pub mod mapping;
pub mod repository;
pub mod service;
pub mod types;

#[cfg(test)]
mod engine_props;

pub use engine::{ConsolidationEngine, EngineOutput};
pub use error::ConsolidationError;
pub use mapping::{AccountMapping, MappingError, MappingRule};
pub use repository::ConsolidationRepository;
pub use service::ConsolidationService;
pub use types::{
    ConsolidatedBudget, ConsolidationCategory, ConsolidationLineItem, ConsolidationRun,
    ConsolidationStatus, ConsolidationTotals, ConsolidationValidation,
};
