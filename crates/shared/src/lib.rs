//! Shared types, errors, and configuration for Schoolplan.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Pagination types for list endpoints
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, LogFormat, PeriodSplitConfig, PlanningConfig, StorageBackend};
pub use error::{AppError, AppResult};
