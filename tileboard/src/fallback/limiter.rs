//! Per-tile-type concurrency limiter for builds.
//!
//! Builds that outlive their caller keep running in the background, so the
//! number of spawned builder tasks has to be bounded somewhere. Each tile
//! type gets its own semaphore: a slow downstream system can exhaust the
//! permits of its own tile type but never starve the others.
//!
//! ```text
//! CI     ──► Semaphore(8) ──► at most 8 CI builds in flight
//! GITHUB ──► Semaphore(8) ──► at most 8 GITHUB builds in flight
//! ```
//!
//! Permits are owned (`OwnedSemaphorePermit`) so they can move into the
//! spawned build task and are released only when the build really ends.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::tile::TileType;

/// Bounds concurrent builds per tile type.
#[derive(Debug)]
pub struct BuildLimiter {
    permits_per_type: usize,
    semaphores: DashMap<TileType, Arc<Semaphore>>,
    closed: AtomicBool,
}

impl BuildLimiter {
    /// Create a limiter allowing `permits_per_type` concurrent builds per
    /// tile type.
    ///
    /// # Panics
    ///
    /// Panics if `permits_per_type` is zero.
    pub fn new(permits_per_type: usize) -> Self {
        assert!(permits_per_type > 0, "permits_per_type must be > 0");
        Self {
            permits_per_type,
            semaphores: DashMap::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Wait for a build permit for `tile_type`.
    ///
    /// Returns `None` once the limiter is closed.
    pub async fn acquire(&self, tile_type: &TileType) -> Option<OwnedSemaphorePermit> {
        if self.closed.load(Ordering::Acquire) {
            return None;
        }
        let semaphore = self.semaphore(tile_type);
        semaphore.acquire_owned().await.ok()
    }

    /// Number of builds currently holding a permit for `tile_type`.
    pub fn in_flight(&self, tile_type: &TileType) -> usize {
        self.semaphores
            .get(tile_type)
            .map(|s| self.permits_per_type - s.available_permits())
            .unwrap_or(0)
    }

    /// Maximum concurrent builds per tile type.
    pub fn permits_per_type(&self) -> usize {
        self.permits_per_type
    }

    /// Refuse new permits and wake every waiter with `None`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        for entry in self.semaphores.iter() {
            entry.value().close();
        }
    }

    fn semaphore(&self, tile_type: &TileType) -> Arc<Semaphore> {
        self.semaphores
            .entry(tile_type.clone())
            .or_insert_with(|| Arc::new(Semaphore::new(self.permits_per_type)))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_permits_are_per_tile_type() {
        let limiter = BuildLimiter::new(1);
        let ci = TileType::new("CI");
        let github = TileType::new("GITHUB");

        let _ci_permit = limiter.acquire(&ci).await.unwrap();
        assert_eq!(limiter.in_flight(&ci), 1);

        // Another type is not blocked by CI
        let github_permit = limiter.acquire(&github).await;
        assert!(github_permit.is_some());

        // A second CI build has to wait
        let waited = tokio::time::timeout(Duration::from_millis(20), limiter.acquire(&ci)).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_permit_released_on_drop() {
        let limiter = BuildLimiter::new(1);
        let ci = TileType::new("CI");

        let permit = limiter.acquire(&ci).await.unwrap();
        drop(permit);

        assert_eq!(limiter.in_flight(&ci), 0);
        assert!(limiter.acquire(&ci).await.is_some());
    }

    #[tokio::test]
    async fn test_close_rejects_waiters_and_new_callers() {
        let limiter = Arc::new(BuildLimiter::new(1));
        let ci = TileType::new("CI");
        let _held = limiter.acquire(&ci).await.unwrap();

        let waiter = {
            let limiter = Arc::clone(&limiter);
            let ci = ci.clone();
            tokio::spawn(async move { limiter.acquire(&ci).await.is_none() })
        };
        tokio::task::yield_now().await;

        limiter.close();

        assert!(waiter.await.unwrap());
        assert!(limiter.acquire(&TileType::new("OTHER")).await.is_none());
    }

    #[test]
    #[should_panic(expected = "permits_per_type must be > 0")]
    fn test_zero_permits_panics() {
        let _ = BuildLimiter::new(0);
    }
}
