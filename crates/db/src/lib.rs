//! Persistence for Schoolplan.
//!
//! This crate provides:
//! - `SeaORM` entity definitions and migrations
//! - [`PgStore`], the Postgres implementation of the core repository traits
//! - [`MemoryStore`], the same traits over in-process maps
//! - The demo school dataset

pub mod demo;
pub mod entities;
pub mod memory;
pub mod migration;
pub mod repositories;

pub use demo::{DemoDataset, demo_dataset};
pub use memory::MemoryStore;
pub use repositories::{PgPlanningAdapter, PgStore};

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a connection pool to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(
    database_url: &str,
    max_connections: u32,
    min_connections: u32,
) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url);
    options
        .max_connections(max_connections)
        .min_connections(min_connections)
        .sqlx_logging(false);
    Database::connect(options).await
}
