//! Core traits for the build result store.
//!
//! The `Cache` trait is the black-box key-value store behind the
//! timeout-fallback build cache. Providers implement it so the fallback
//! protocol can run on any backend through a consistent interface.
//!
//! # Design Principles
//!
//! - **String keys**: Human-readable for debugging (`tileboard.config.dynamicTile.key.CI.default.<hash>`)
//! - **Vec<u8> values**: Raw bytes, serialization is the client's concern
//! - **Per-entry TTL**: Each `set` carries its own expiration
//! - **Two operations**: The fallback protocol only needs `get` and `set`
//! - **Dyn-compatible**: Uses `Pin<Box<dyn Future>>` for trait object support
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use tileboard::cache::{Cache, MemoryCacheProvider};
//!
//! let cache = MemoryCacheProvider::new(10_000);
//! cache.set("key", vec![1, 2, 3], Some(Duration::from_secs(60))).await?;
//! let value = cache.get("key").await?;
//! ```

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Key exceeds maximum allowed size.
    #[error("Key too large: {size} bytes (max: {max})")]
    KeyTooLarge { size: usize, max: usize },

    /// A zero TTL would make the entry expire before anyone could read it.
    #[error("TTL must be greater than zero")]
    ZeroTtl,
}

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Generic cache interface for key-value storage with expiration.
///
/// # Expiration
///
/// Entries are purely time-expired: a TTL is fixed when the entry is written
/// and reads never extend it. An entry older than its TTL must be reported as
/// absent by `get`, even if the provider has not physically removed it yet.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` for use across async tasks.
/// Concurrent `set` calls on the same key are last-write-wins.
pub trait Cache: Send + Sync {
    /// Store a value with the given key.
    ///
    /// If the key already exists, the value and its TTL are replaced.
    ///
    /// # Arguments
    ///
    /// * `key` - The cache key
    /// * `value` - The value to store
    /// * `ttl` - Time-to-live, `None` keeps the entry until evicted for space
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the key exceeds size limits or the TTL is zero.
    fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> BoxFuture<'_, Result<(), CacheError>>;

    /// Retrieve a value by key.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(data))` if the key exists and has not expired
    /// - `Ok(None)` if the key is not found or expired
    /// - `Err(_)` if an error occurs
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, CacheError>>;
}
