//! Cache provider implementations.
//!
//! Each provider implements the `Cache` trait and manages its own
//! expiration.
//!
//! # Available Providers
//!
//! - [`MemoryCacheProvider`]: In-memory store using moka with per-entry TTL

mod memory;

pub use memory::{MemoryCacheProvider, MAX_KEY_BYTES};
