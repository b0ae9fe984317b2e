//! Domain-specific cache clients.
//!
//! These clients wrap the generic `Cache` trait with domain-specific key
//! derivation and serialization.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │       BuildCacheClient        │
//! │                               │
//! │ (type, variant, params) → key │
//! │ Vec<TileDescriptor> ↔ JSON    │
//! └───────────────┬───────────────┘
//!                 │
//!                 ▼
//! ┌──────────────────────────────┐
//! │        Arc<dyn Cache>         │
//! │                               │
//! │ Generic key-value store       │
//! │ (string → Vec<u8>, TTL)       │
//! └──────────────────────────────┘
//! ```
//!
//! # Key Format
//!
//! `"tileboard.config.dynamicTile.key.{type}.{variant}.{fingerprint}"`

mod build;

pub use build::{BuildCacheClient, DYNAMIC_TILE_STORE_KEY_PREFIX};
