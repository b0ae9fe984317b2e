//! Cache client for dynamic tile build results.
//!
//! This client wraps a generic `Cache` with:
//! - Key derivation: `(TileType, Variant, params)` → `"{prefix}.{type}.{variant}.{fingerprint}"`
//! - Serialization: `Vec<TileDescriptor>` ↔ JSON bytes
//! - TTL: every write uses the configured downstream store expiration
//!
//! Store failures are logged and treated as misses: the fallback cache only
//! ever improves availability, it must not turn a good build into an error.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::traits::Cache;
use crate::tile::{TileDescriptor, TileType, Variant};
use crate::validator::ValidatedParams;

/// Prefix of every dynamic tile build key.
pub const DYNAMIC_TILE_STORE_KEY_PREFIX: &str = "tileboard.config.dynamicTile.key";

/// Cache client for dynamic tile build results.
#[derive(Clone)]
pub struct BuildCacheClient {
    /// The underlying generic cache.
    cache: Arc<dyn Cache>,

    /// Expiration applied to every stored build result.
    ttl: Duration,
}

impl BuildCacheClient {
    /// Create a new build cache client.
    ///
    /// # Arguments
    ///
    /// * `cache` - The underlying cache implementation
    /// * `ttl` - Expiration of stored build results
    pub fn new(cache: Arc<dyn Cache>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    /// Expiration applied to stored build results.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Derive the cache key of a build.
    ///
    /// Format: `{prefix}.{tile_type}.{variant}.{params fingerprint}`
    pub fn key(tile_type: &TileType, variant: &Variant, params: &ValidatedParams) -> String {
        format!(
            "{}.{}.{}.{}",
            DYNAMIC_TILE_STORE_KEY_PREFIX,
            tile_type,
            variant,
            params.fingerprint()
        )
    }

    /// Get the last successful build stored under `key`.
    ///
    /// Returns `None` on miss, expiry, store error or undecodable data.
    pub async fn get(&self, key: &str) -> Option<Vec<TileDescriptor>> {
        match self.cache.get(key).await {
            Ok(Some(data)) => match serde_json::from_slice(&data) {
                Ok(tiles) => {
                    debug!(key = %key, "Build cache hit");
                    Some(tiles)
                }
                Err(e) => {
                    warn!(error = %e, key = %key, "Discarding undecodable build cache entry");
                    None
                }
            },
            Ok(None) => {
                debug!(key = %key, "Build cache miss");
                None
            }
            Err(e) => {
                warn!(error = %e, key = %key, "Build cache get failed");
                None
            }
        }
    }

    /// Store a successful build under `key` with the configured TTL.
    pub async fn set(&self, key: &str, tiles: &[TileDescriptor]) {
        let data = match serde_json::to_vec(tiles) {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, key = %key, "Failed to serialize build result");
                return;
            }
        };

        if let Err(e) = self.cache.set(key, data, Some(self.ttl)).await {
            warn!(error = %e, key = %key, "Build cache set failed");
        }
    }
}
