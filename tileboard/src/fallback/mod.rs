//! Timeout-fallback builds for dynamic tiles.
//!
//! A dynamic tile's builder usually calls a downstream API. When that API is
//! slow or failing, the dashboard would rather show the last known sub-tiles
//! than block or break. This module provides:
//!
//! - [`FallbackBuilder`] - Races a builder against a budget, falls back to the cache
//! - [`BuildLimiter`] - Bounds in-flight builds per tile type
//! - [`FallbackStats`] - Counters of fresh, cached and unavailable results
//!
//! # Example
//!
//! ```ignore
//! let fallback = FallbackBuilder::new(registry, cache_client, 8, Duration::from_secs(2));
//!
//! match fallback.build_with_fallback(&tile_type, &variant, &params, budget).await {
//!     Ok(BuildOutcome { tiles, source: BuildSource::Fresh }) => { /* up to date */ }
//!     Ok(BuildOutcome { tiles, source: BuildSource::Cached }) => { /* stale but valid */ }
//!     Err(e) if e.is_retryable() => { /* timed out, nothing cached */ }
//!     Err(e) => { /* failed */ }
//! }
//! ```

mod limiter;
mod service;
mod stats;

pub use limiter::BuildLimiter;
pub use service::{BuildOutcome, BuildSource, FallbackBuilder};
pub use stats::{FallbackSnapshot, FallbackStats};
