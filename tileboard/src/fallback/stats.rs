//! Counters for the fallback build protocol.
//!
//! Lock-free atomic counters updated on every build, with a point-in-time
//! [`FallbackSnapshot`] for display.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters describing how builds were served.
#[derive(Debug, Default)]
pub struct FallbackStats {
    fresh: AtomicU64,
    cached: AtomicU64,
    unavailable: AtomicU64,
    budget_exceeded: AtomicU64,
    build_failures: AtomicU64,
    background_refreshes: AtomicU64,
    background_failures: AtomicU64,
}

/// Point-in-time copy of [`FallbackStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FallbackSnapshot {
    /// Builds that finished within budget.
    pub fresh: u64,
    /// Requests served from a previous build.
    pub cached: u64,
    /// Requests that got neither a fresh nor a cached result.
    pub unavailable: u64,
    /// Builds still running when the budget elapsed.
    pub budget_exceeded: u64,
    /// Builds that returned an error while the caller was waiting.
    pub build_failures: u64,
    /// Abandoned builds that later refreshed the cache.
    pub background_refreshes: u64,
    /// Abandoned builds that later failed.
    pub background_failures: u64,
}

impl FallbackStats {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_fresh(&self) {
        self.fresh.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cached(&self) {
        self.cached.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unavailable(&self) {
        self.unavailable.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_budget_exceeded(&self) {
        self.budget_exceeded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_build_failure(&self) {
        self.build_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_background_refresh(&self) {
        self.background_refreshes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_background_failure(&self) {
        self.background_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of all counters.
    pub fn snapshot(&self) -> FallbackSnapshot {
        FallbackSnapshot {
            fresh: self.fresh.load(Ordering::Relaxed),
            cached: self.cached.load(Ordering::Relaxed),
            unavailable: self.unavailable.load(Ordering::Relaxed),
            budget_exceeded: self.budget_exceeded.load(Ordering::Relaxed),
            build_failures: self.build_failures.load(Ordering::Relaxed),
            background_refreshes: self.background_refreshes.load(Ordering::Relaxed),
            background_failures: self.background_failures.load(Ordering::Relaxed),
        }
    }
}
