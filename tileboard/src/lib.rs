//! Tileboard - tile config registry and dynamic tile builds for dashboards
//!
//! A dashboard is a grid of tiles. Every tile type is declared once at
//! startup in a [`ConfigRegistry`]:
//!
//! - **static tiles** map a `(type, variant)` pair to a validator, a route and
//!   an initial refresh delay;
//! - **dynamic tiles** map it to a validator and a [`DynamicTileBuilder`] that
//!   expands the tile into concrete static tiles by asking a downstream system.
//!
//! Dynamic builds go through the [`FallbackBuilder`], which waits at most a
//! time budget for the builder and otherwise serves the last successful
//! result for the same params from the build cache. Slow builds keep running
//! in the background and refresh the cache when they finish.
//!
//! User-supplied dashboard configs are checked by [`dashboard::Verifier`] and
//! turned into renderable tiles by [`dashboard::Hydrator`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use serde::{Deserialize, Serialize};
//! use tileboard::{ConfigRegistry, JsonValidator, TileType, Variant};
//!
//! #[derive(Serialize, Deserialize)]
//! struct PingParams {
//!     hostname: String,
//! }
//!
//! let mut registry = ConfigRegistry::new();
//! registry.register_tile(
//!     "PING",
//!     Arc::new(JsonValidator::<PingParams>::new()),
//!     "/api/v1/ping",
//!     Duration::from_millis(1700),
//! );
//!
//! let config = registry
//!     .lookup_tile(&TileType::new("PING"), &Variant::DEFAULT)
//!     .unwrap();
//! assert_eq!(config.path, "/api/v1/ping");
//! ```

pub mod builder;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod fallback;
pub mod logging;
pub mod registry;
pub mod tile;
pub mod validator;
pub mod version;

pub use builder::{BuildError, DynamicTileBuilder};
pub use error::{Result, TileboardError};
pub use fallback::{BuildOutcome, BuildSource, FallbackBuilder};
pub use registry::{ConfigRegistry, DynamicTileConfig, TileConfig, TileEntry};
pub use tile::{TileDescriptor, TileType, Variant};
pub use validator::{JsonValidator, ValidatedParams, ValidationError, Validator};
