//! Translation metrics and observability module.
//!
//! This module provides metrics tracking for translation lookups,
//! including cache hit rates, rows created, and machine translator calls.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters owned by a resolver instance.
#[derive(Debug, Default)]
pub struct TranslationMetrics {
    /// Number of lookups served from the key-value cache
    cache_hits: AtomicUsize,

    /// Number of lookups that fell through to the store
    cache_misses: AtomicUsize,

    /// Number of locale or translation rows written by get-or-create
    rows_created: AtomicUsize,

    /// Number of calls made to the machine translator
    api_calls: AtomicUsize,

    /// Number of machine translator calls that failed
    api_failures: AtomicUsize,
}

impl TranslationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a cache hit.
    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cache miss.
    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a row created in the store.
    pub fn record_row_created(&self) {
        self.rows_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a call to the machine translator.
    pub fn record_api_call(&self) {
        self.api_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a machine translator failure.
    pub fn record_api_failure(&self) {
        self.api_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_hits(&self) -> usize {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> usize {
        self.cache_misses.load(Ordering::Relaxed)
    }

    pub fn rows_created(&self) -> usize {
        self.rows_created.load(Ordering::Relaxed)
    }

    pub fn api_calls(&self) -> usize {
        self.api_calls.load(Ordering::Relaxed)
    }

    pub fn api_failures(&self) -> usize {
        self.api_failures.load(Ordering::Relaxed)
    }

    /// Generate a metrics report.
    pub fn report(&self) -> MetricsReport {
        let hits = self.cache_hits();
        let misses = self.cache_misses();
        let total_cache_queries = hits + misses;
        let cache_hit_rate = if total_cache_queries > 0 {
            (hits as f64 / total_cache_queries as f64) * 100.0
        } else {
            0.0
        };

        let calls = self.api_calls();
        let failures = self.api_failures();
        let api_success_rate = if calls > 0 {
            (calls.saturating_sub(failures) as f64 / calls as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            cache_hits: hits,
            cache_misses: misses,
            cache_hit_rate,
            rows_created: self.rows_created(),
            api_calls: calls,
            api_failures: failures,
            api_success_rate,
        }
    }
}

/// Snapshot of the translation counters.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub cache_hits: usize,
    pub cache_misses: usize,

    /// Cache hit rate as a percentage (0-100)
    pub cache_hit_rate: f64,

    pub rows_created: usize,
    pub api_calls: usize,
    pub api_failures: usize,

    /// API success rate as a percentage (0-100)
    pub api_success_rate: f64,
}
