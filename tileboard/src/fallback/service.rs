//! Timeout-fallback build service.
//!
//! [`FallbackBuilder::build_with_fallback`] runs a dynamic tile's builder on a
//! spawned task and races it against the caller's budget:
//!
//! ```text
//!              ┌──────────────── spawn ────────────────┐
//!              │                                        ▼
//! caller ──► permit ──► select! ──► build done ──► Ok(tiles)  ──► (tiles, Fresh)
//!                         │                  └──► Err(e)     ──► cache? (tiles, Cached) : BuildFailure
//!                         └──► budget elapsed ──────────────────► cache? (tiles, Cached) : BuildTimeout
//!                                     │
//!                                     └──► build detached, keeps running, refreshes cache
//! ```
//!
//! The build task writes the cache itself on success, so a build that
//! finishes after its caller gave up still refreshes the entry for the next
//! request. Abandoned builds are never aborted (builders may have downstream
//! side effects); they are bounded by the per-type [`BuildLimiter`] and
//! cancelled only on [`shutdown`](FallbackBuilder::shutdown).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::builder::BuildError;
use crate::cache::BuildCacheClient;
use crate::error::{Result, TileboardError};
use crate::fallback::limiter::BuildLimiter;
use crate::fallback::stats::{FallbackSnapshot, FallbackStats};
use crate::registry::ConfigRegistry;
use crate::tile::{TileDescriptor, TileType, Variant};
use crate::validator::ValidatedParams;

/// Where a build result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildSource {
    /// The builder finished within budget.
    Fresh,
    /// A previous build, served because this one was slow or failed.
    Cached,
}

/// Successful outcome of [`FallbackBuilder::build_with_fallback`].
///
/// When neither source is available the call returns an error instead
/// (`BuildTimeout` or `BuildFailure`).
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutcome {
    /// The sub-tiles.
    pub tiles: Vec<TileDescriptor>,
    /// Whether the sub-tiles are fresh or a fallback.
    pub source: BuildSource,
}

/// Why no fresh result is available.
enum Miss {
    Timeout(Duration),
    Failed(BuildError),
}

/// Runs dynamic tile builders under a time budget with a cache fallback.
pub struct FallbackBuilder {
    registry: Arc<ConfigRegistry>,
    cache: BuildCacheClient,
    limiter: Arc<BuildLimiter>,
    stats: Arc<FallbackStats>,
    shutdown: CancellationToken,
    default_budget: Duration,
}

impl FallbackBuilder {
    /// Create a fallback builder.
    ///
    /// # Arguments
    ///
    /// * `registry` - Fully populated registry
    /// * `cache` - Store for last successful builds
    /// * `max_concurrent_builds_per_type` - Bound on in-flight builds per tile type
    /// * `default_budget` - Budget used by [`validate_and_build`](Self::validate_and_build)
    pub fn new(
        registry: Arc<ConfigRegistry>,
        cache: BuildCacheClient,
        max_concurrent_builds_per_type: usize,
        default_budget: Duration,
    ) -> Self {
        Self {
            registry,
            cache,
            limiter: Arc::new(BuildLimiter::new(max_concurrent_builds_per_type)),
            stats: Arc::new(FallbackStats::new()),
            shutdown: CancellationToken::new(),
            default_budget,
        }
    }

    /// The registry builders are resolved from.
    pub fn registry(&self) -> &Arc<ConfigRegistry> {
        &self.registry
    }

    /// Budget used when the caller does not supply one.
    pub fn default_budget(&self) -> Duration {
        self.default_budget
    }

    /// Counters describing how builds were served.
    pub fn stats(&self) -> FallbackSnapshot {
        self.stats.snapshot()
    }

    /// Number of builds of `tile_type` currently running, including
    /// abandoned ones.
    pub fn in_flight(&self, tile_type: &TileType) -> usize {
        self.limiter.in_flight(tile_type)
    }

    /// Validate a raw payload with the dynamic tile's validator, then build
    /// it with the default budget.
    pub async fn validate_and_build(
        &self,
        tile_type: &TileType,
        variant: &Variant,
        raw: &Value,
    ) -> Result<BuildOutcome> {
        let config = self.registry.lookup_dynamic(tile_type, variant)?;
        let params = config
            .validator
            .validate(raw)
            .map_err(|source| TileboardError::Validation {
                tile_type: tile_type.clone(),
                source,
            })?;

        self.build_with_fallback(tile_type, variant, &params, self.default_budget)
            .await
    }

    /// Build a dynamic tile, serving the last cached result if the builder
    /// fails or is still running when `budget` elapses.
    ///
    /// # Errors
    ///
    /// - `UnknownTileType` / `NotDynamic` / `UnknownVariant` when no builder is registered
    /// - `BuildTimeout` when the budget elapsed and nothing usable is cached
    /// - `BuildFailure` when the builder failed and nothing usable is cached
    pub async fn build_with_fallback(
        &self,
        tile_type: &TileType,
        variant: &Variant,
        params: &ValidatedParams,
        budget: Duration,
    ) -> Result<BuildOutcome> {
        let config = self.registry.lookup_dynamic(tile_type, variant)?;
        let key = BuildCacheClient::key(tile_type, variant, params);
        // A budget past the clock's range means no deadline at all
        let deadline = Instant::now()
            .checked_add(budget)
            .unwrap_or_else(far_future);

        // Waiting for a permit counts against the budget
        let permit = match tokio::time::timeout_at(deadline, self.limiter.acquire(tile_type)).await
        {
            Ok(Some(permit)) => permit,
            Ok(None) => {
                return self
                    .fallback(&key, tile_type, variant, Miss::Failed(shutting_down()))
                    .await;
            }
            Err(_) => {
                warn!(
                    tile_type = %tile_type,
                    in_flight = self.limiter.in_flight(tile_type),
                    "Build limit reached, no permit within budget"
                );
                self.stats.record_budget_exceeded();
                return self
                    .fallback(&key, tile_type, variant, Miss::Timeout(budget))
                    .await;
            }
        };

        let abandoned = Arc::new(AtomicBool::new(false));
        let mut handle = {
            let builder = Arc::clone(&config.builder);
            let cache = self.cache.clone();
            let stats = Arc::clone(&self.stats);
            let shutdown = self.shutdown.clone();
            let abandoned = Arc::clone(&abandoned);
            let params = params.clone();
            let key = key.clone();
            let tile_type = tile_type.clone();

            tokio::spawn(async move {
                let _permit = permit;
                let result = tokio::select! {
                    result = builder.build(&params) => result,
                    _ = shutdown.cancelled() => Err(shutting_down()),
                };

                if let Ok(tiles) = &result {
                    cache.set(&key, tiles).await;
                }

                if abandoned.load(Ordering::Acquire) {
                    match &result {
                        Ok(tiles) => {
                            stats.record_background_refresh();
                            info!(
                                tile_type = %tile_type,
                                tiles = tiles.len(),
                                "Background build refreshed cache"
                            );
                        }
                        Err(e) => {
                            stats.record_background_failure();
                            warn!(tile_type = %tile_type, error = %e, "Background build failed");
                        }
                    }
                }

                result
            })
        };

        tokio::select! {
            joined = &mut handle => {
                let result = joined.unwrap_or_else(|e| Err(BuildError::Aborted(e.to_string())));
                match result {
                    Ok(tiles) => {
                        self.stats.record_fresh();
                        debug!(tile_type = %tile_type, variant = %variant, tiles = tiles.len(), "Fresh build");
                        Ok(BuildOutcome {
                            tiles,
                            source: BuildSource::Fresh,
                        })
                    }
                    Err(e) => {
                        self.stats.record_build_failure();
                        warn!(tile_type = %tile_type, variant = %variant, error = %e, "Build failed");
                        self.fallback(&key, tile_type, variant, Miss::Failed(e)).await
                    }
                }
            }
            _ = tokio::time::sleep_until(deadline) => {
                abandoned.store(true, Ordering::Release);
                // Detach: the build keeps its permit and refreshes the cache when done
                drop(handle);
                self.stats.record_budget_exceeded();
                warn!(
                    tile_type = %tile_type,
                    variant = %variant,
                    budget_ms = budget.as_millis() as u64,
                    "Build exceeded budget"
                );
                self.fallback(&key, tile_type, variant, Miss::Timeout(budget)).await
            }
        }
    }

    /// Cancel every running build and refuse new ones.
    ///
    /// Callers still waiting get the cached result or a `BuildFailure`.
    pub fn shutdown(&self) {
        info!("Shutting down fallback builder");
        self.shutdown.cancel();
        self.limiter.close();
    }

    async fn fallback(
        &self,
        key: &str,
        tile_type: &TileType,
        variant: &Variant,
        miss: Miss,
    ) -> Result<BuildOutcome> {
        if let Some(tiles) = self.cache.get(key).await {
            self.stats.record_cached();
            info!(
                tile_type = %tile_type,
                variant = %variant,
                tiles = tiles.len(),
                "Serving cached build result"
            );
            return Ok(BuildOutcome {
                tiles,
                source: BuildSource::Cached,
            });
        }

        self.stats.record_unavailable();
        Err(match miss {
            Miss::Timeout(budget) => TileboardError::BuildTimeout {
                tile_type: tile_type.clone(),
                variant: variant.clone(),
                budget,
            },
            Miss::Failed(source) => TileboardError::BuildFailure {
                tile_type: tile_type.clone(),
                variant: variant.clone(),
                source,
            },
        })
    }
}

impl Drop for FallbackBuilder {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(86_400 * 365 * 30)
}

fn shutting_down() -> BuildError {
    BuildError::Aborted("fallback builder is shutting down".to_string())
}
