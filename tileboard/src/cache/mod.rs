//! Build result storage for the timeout-fallback protocol.
//!
//! - [`Cache`] trait - Generic key-value interface (string keys, byte values, TTL)
//! - [`MemoryCacheProvider`] - In-memory store using moka
//! - [`BuildCacheClient`] - Dynamic tile key derivation and serialization
//!
//! ```ignore
//! use std::sync::Arc;
//! use tileboard::cache::{BuildCacheClient, MemoryCacheProvider};
//!
//! let store = Arc::new(MemoryCacheProvider::new(64 * 1024 * 1024));
//! let client = BuildCacheClient::new(store, Duration::from_secs(120));
//! ```

pub mod clients;
pub mod providers;
mod traits;

pub use clients::{BuildCacheClient, DYNAMIC_TILE_STORE_KEY_PREFIX};
pub use providers::MemoryCacheProvider;
pub use traits::{BoxFuture, Cache, CacheError};
