//! Postgres implementations of the core repository and adapter traits.
//!
//! [`PgStore`] wraps one connection pool and implements every trait; each
//! aggregate lives in its own module.

mod consolidation;
mod convert;
mod planning;
mod projection;
mod version;

use sea_orm::{DatabaseConnection, DbErr};

use schoolplan_core::error::StoreError;

pub use planning::PgPlanningAdapter;

/// Postgres-backed store.
#[derive(Debug, Clone)]
pub struct PgStore {
    db: DatabaseConnection,
}

impl PgStore {
    /// Creates a store over an open connection pool.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

pub(crate) fn db_err(e: DbErr) -> StoreError {
    StoreError::Database(e.to_string())
}
