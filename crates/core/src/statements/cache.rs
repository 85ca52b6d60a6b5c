//! Rendered statement caching using Moka.
//!
//! Keys include the consolidation fingerprint, so a new consolidation run
//! with different data never serves a stale statement.

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;

use schoolplan_shared::types::VersionId;

use crate::statements::types::{FinancialStatement, StatementFormat, StatementPeriod, StatementType};

/// Default cache capacity (number of statements).
const DEFAULT_CACHE_CAPACITY: u64 = 256;

/// Default time-to-live for cache entries (5 minutes).
const DEFAULT_TTL_SECS: u64 = 300;

/// Cache key of one rendered statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatementKey {
    /// Version.
    pub version_id: VersionId,
    /// Fingerprint of the consolidation rendered.
    pub fingerprint: String,
    /// Statement kind.
    pub statement_type: StatementType,
    /// Presentation standard.
    pub format: StatementFormat,
    /// Period.
    pub period: StatementPeriod,
}

/// Bounded TTL cache of rendered statements.
#[derive(Clone)]
pub struct StatementCache {
    cache: Cache<StatementKey, Arc<FinancialStatement>>,
}

impl Default for StatementCache {
    fn default() -> Self {
        Self::with_config(DEFAULT_CACHE_CAPACITY, DEFAULT_TTL_SECS)
    }
}

impl StatementCache {
    /// Creates a cache with custom capacity and TTL.
    #[must_use]
    pub fn with_config(max_capacity: u64, ttl_secs: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();
        Self { cache }
    }

    /// Returns the cached statement or renders and stores it.
    pub fn get_or_render(
        &self,
        key: StatementKey,
        render: impl FnOnce() -> FinancialStatement,
    ) -> Arc<FinancialStatement> {
        self.cache.get_with(key, || Arc::new(render()))
    }

    /// Drops every statement of a version.
    pub fn invalidate_version(&self, version_id: VersionId) {
        let stale: Vec<StatementKey> = self
            .cache
            .iter()
            .filter(|(key, _)| key.version_id == version_id)
            .map(|(key, _)| (*key).clone())
            .collect();
        for key in stale {
            self.cache.invalidate(&key);
        }
    }

    /// Returns the number of entries in the cache.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}
