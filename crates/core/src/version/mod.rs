//! Budget version store.
//!
//! Versions are the containers every planning module writes into. Status
//! changes go through the workflow state machine; field edits are only
//! accepted while WORKING.

pub mod error;
pub mod repository;
pub mod service;
pub mod types;

pub use error::VersionError;
pub use repository::VersionRepository;
pub use service::VersionService;
pub use types::{BudgetVersion, CreateVersionInput, ScenarioType, UpdateVersionInput, VersionFilter};
