//! In-memory cache provider using moka.
//!
//! This provider wraps `moka::future::Cache` to provide an async-safe,
//! lock-free in-memory store with per-entry expiration.
//!
//! # Expiration
//!
//! Every entry carries the TTL it was written with. Moka's `Expiry` hook
//! schedules removal from that TTL, and reads double-check the recorded
//! deadline so an entry past its TTL is never returned, even when moka has
//! not run its maintenance yet. Reads never extend the deadline.

use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::future::Cache as MokaCache;
use moka::Expiry;

use crate::cache::traits::{BoxFuture, Cache, CacheError};

/// Maximum key length accepted by the provider.
pub const MAX_KEY_BYTES: usize = 1024;

/// A stored value together with its expiration metadata.
#[derive(Clone)]
struct StoredEntry {
    data: Arc<Vec<u8>>,
    ttl: Option<Duration>,
    expires_at: Option<Instant>,
}

impl StoredEntry {
    fn new(data: Vec<u8>, ttl: Option<Duration>) -> Self {
        Self {
            data: Arc::new(data),
            ttl,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |deadline| now < deadline)
    }
}

/// Expiration policy honoring the TTL recorded on each entry.
struct EntryExpiry;

impl Expiry<String, StoredEntry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    // Overwrites restart the clock with the new entry's TTL.
    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// In-memory cache provider using moka.
///
/// Size-bounded by the byte weight of keys and values; entries past their
/// TTL are treated as absent.
pub struct MemoryCacheProvider {
    /// The underlying moka cache.
    cache: MokaCache<String, StoredEntry>,
}

impl MemoryCacheProvider {
    /// Create a new memory cache provider.
    ///
    /// # Arguments
    ///
    /// * `max_size_bytes` - Maximum cache size in bytes
    pub fn new(max_size_bytes: u64) -> Self {
        let cache = MokaCache::builder()
            // Weight each entry by its key and data size
            .weigher(|key: &String, value: &StoredEntry| -> u32 {
                // moka uses u32 for weights, cap at u32::MAX for very large entries
                (key.len() + value.data.len()).min(u32::MAX as usize) as u32
            })
            .max_capacity(max_size_bytes)
            .expire_after(EntryExpiry)
            .build();

        Self { cache }
    }

    async fn live_entry(&self, key: &str) -> Option<StoredEntry> {
        let entry = self.cache.get(key).await?;
        if entry.is_live(Instant::now()) {
            Some(entry)
        } else {
            self.cache.invalidate(key).await;
            None
        }
    }
}

impl Cache for MemoryCacheProvider {
    fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> BoxFuture<'_, Result<(), CacheError>> {
        let key = key.to_string();
        Box::pin(async move {
            if key.len() > MAX_KEY_BYTES {
                return Err(CacheError::KeyTooLarge {
                    size: key.len(),
                    max: MAX_KEY_BYTES,
                });
            }
            if ttl == Some(Duration::ZERO) {
                return Err(CacheError::ZeroTtl);
            }
            self.cache.insert(key, StoredEntry::new(value, ttl)).await;
            Ok(())
        })
    }

    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, CacheError>> {
        let key = key.to_string();
        Box::pin(async move {
            Ok(self
                .live_entry(&key)
                .await
                .map(|entry| (*entry.data).clone()))
        })
    }
}
