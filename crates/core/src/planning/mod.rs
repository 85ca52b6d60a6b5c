//! Planning module adapters.
//!
//! The six planning modules (enrollment, class structure, DHG, revenue,
//! costs, CapEx) are external collaborators. Consolidation only sees them
//! through [`PlanningModuleAdapter`].

pub mod adapter;
pub mod types;

pub use adapter::{AdapterError, ModuleAdapters, PlanningModuleAdapter};
pub use types::{PeriodAmounts, PlanningModule, PlanningRecord};
