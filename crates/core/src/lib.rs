//! Core business logic for Schoolplan.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Storage and planning modules are reached through the repository and
//! adapter traits declared here.
//!
//! # Modules
//!
//! - `workflow` - Version lifecycle state machine
//! - `version` - Budget version store and transitions
//! - `planning` - Read-only adapters over the six planning modules
//! - `consolidation` - Aggregation of module records into line items
//! - `statements` - PCG and IFRS financial statements
//! - `projection` - Enrollment projection with the override cascade

pub mod consolidation;
pub mod error;
pub mod locks;
pub mod planning;
pub mod projection;
pub mod statements;
pub mod version;
pub mod workflow;

#[cfg(test)]
mod test_support;
