//! Budget version workflow for Schoolplan.
//!
//! This module implements the version lifecycle state machine
//! (WORKING → SUBMITTED → APPROVED, with REJECTED and SUPERSEDED).
//!
//! # Modules
//!
//! - `types` - Workflow domain types (VersionStatus, WorkflowAction)
//! - `error` - Workflow-specific error types
//! - `service` - Transition table and action construction

pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use error::WorkflowError;
pub use service::WorkflowService;
pub use types::{StatusTransition, VersionStatus, WorkflowAction, WorkflowCommand};
