//! # Search Cache Module
//!
//! ## Purpose
//! A single-slot, parameter-keyed, time-bounded memo of the last successful
//! search result set, so repeating an identical search within the freshness
//! window never hits the store.
//!
//! ## Input/Output Specification
//! - **Input**: Result sets with their normalized request parameters
//! - **Output**: Cache hits (cloned result list) or misses
//! - **Lifecycle**: Overwrite-only single slot; entries stale after the TTL
//!
//! A hit requires all of: an entry exists, its stored params deep-equal the
//! request, its result list is non-empty, and it is younger than the TTL.
//! Any failed condition is a miss, never an error.

use crate::filters::SearchParams;
use crate::Property;
use chrono::{DateTime, Utc};

/// One cached search result set
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Ordered result list from the last successful dispatch
    pub results: Vec<Property>,
    /// Snapshot of the request that produced these results
    pub params: SearchParams,
    /// When the entry was stored
    pub stored_at: DateTime<Utc>,
}

/// Single-slot result cache
pub struct SearchCache {
    slot: Option<CacheEntry>,
    ttl_ms: i64,
}

impl SearchCache {
    /// Create a cache with the given freshness window in milliseconds
    pub fn new(ttl_ms: i64) -> Self {
        Self { slot: None, ttl_ms }
    }

    /// Return the cached results if the entry matches `params` and is fresh
    pub fn lookup(&self, params: &SearchParams) -> Option<Vec<Property>> {
        let entry = self.slot.as_ref()?;

        if entry.params != *params {
            tracing::debug!("cache miss: parameters changed");
            return None;
        }
        if entry.results.is_empty() {
            tracing::debug!("cache miss: stored result set is empty");
            return None;
        }

        let age_ms = (Utc::now() - entry.stored_at).num_milliseconds();
        if age_ms >= self.ttl_ms {
            tracing::debug!(age_ms, "cache miss: entry is stale");
            return None;
        }

        tracing::debug!(age_ms, results = entry.results.len(), "cache hit");
        Some(entry.results.clone())
    }

    /// Store a result set, overwriting any previous entry
    pub fn store(&mut self, results: Vec<Property>, params: SearchParams) {
        self.slot = Some(CacheEntry {
            results,
            params,
            stored_at: Utc::now(),
        });
    }

    /// Drop the cached entry
    pub fn clear(&mut self) {
        self.slot = None;
    }

    #[cfg(test)]
    fn store_with_timestamp(
        &mut self,
        results: Vec<Property>,
        params: SearchParams,
        stored_at: DateTime<Utc>,
    ) {
        self.slot = Some(CacheEntry {
            results,
            params,
            stored_at,
        });
    }
}
