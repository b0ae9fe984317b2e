//! Tile configuration registry.
//!
//! The [`ConfigRegistry`] records, for every tile type and variant, how the
//! tile is validated and served:
//!
//! - **Static tiles** ([`TileConfig`]): validator, route path and the
//!   initial scheduling delay.
//! - **Dynamic tiles** ([`DynamicTileConfig`]): validator and the builder
//!   that expands the tile into concrete sub-tiles.
//!
//! # Lifecycle
//!
//! ```text
//! startup:  ConfigRegistry::new() ──► register_* (&mut self) ──► Arc::new(registry)
//! requests:                                                      resolve* / is_authorized (&self)
//! ```
//!
//! Registration takes `&mut self`, so once the registry is shared behind an
//! `Arc` it can no longer be mutated. Registration misuse (empty identifiers,
//! configuring a structural pseudo-type) is a programming error and panics.
//!
//! # Authorization
//!
//! A tile type is *authorized* when it has a top-level entry in the static
//! table, even without any configured variant. `EMPTY` and `GROUP` are
//! authorized from construction, and registering a dynamic tile authorizes
//! its type as well.

mod dynamic;
mod tile;

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, TileboardError};
use crate::tile::{TileType, Variant};
use crate::validator::Validator;

pub use dynamic::DynamicTileConfig;
pub use tile::TileConfig;

/// A variant resolved from either table.
#[derive(Debug, Clone, Copy)]
pub enum TileEntry<'a> {
    Static(&'a TileConfig),
    Dynamic(&'a DynamicTileConfig),
}

impl TileEntry<'_> {
    /// The validator of the resolved variant.
    pub fn validator(&self) -> &Arc<dyn Validator> {
        match self {
            TileEntry::Static(config) => &config.validator,
            TileEntry::Dynamic(config) => &config.validator,
        }
    }
}

/// Registry of static and dynamic tile configurations.
pub struct ConfigRegistry {
    /// `None` marks a type that is authorized but has no static variant.
    tile_configs: HashMap<TileType, Option<HashMap<Variant, TileConfig>>>,

    dynamic_tile_configs: HashMap<TileType, HashMap<Variant, DynamicTileConfig>>,
}

impl ConfigRegistry {
    /// Create a registry with the structural pseudo-types pre-authorized.
    pub fn new() -> Self {
        let mut tile_configs = HashMap::new();
        tile_configs.insert(TileType::EMPTY, None);
        tile_configs.insert(TileType::GROUP, None);

        Self {
            tile_configs,
            dynamic_tile_configs: HashMap::new(),
        }
    }

    /// Returns true if the tile type is known, configured or not.
    pub fn is_authorized(&self, tile_type: &TileType) -> bool {
        self.tile_configs.contains_key(tile_type)
    }

    /// Returns true if a dynamic builder is registered for the tile type.
    pub fn is_dynamic(&self, tile_type: &TileType) -> bool {
        self.dynamic_tile_configs.contains_key(tile_type)
    }

    /// Comma-separated list of every authorized tile type, sorted.
    pub fn authorized_types(&self) -> String {
        keys(self.tile_configs.keys())
    }

    /// Resolve a variant in either table, dynamic first.
    ///
    /// On an unknown variant the error lists the static and dynamic variants
    /// of the type together.
    pub fn lookup_entry(&self, tile_type: &TileType, variant: &Variant) -> Result<TileEntry<'_>> {
        if let Some(config) = self.resolve_dynamic(tile_type, variant) {
            return Ok(TileEntry::Dynamic(config));
        }
        if let Some(config) = self.resolve(tile_type, variant) {
            return Ok(TileEntry::Static(config));
        }

        let Some(static_variants) = self.tile_configs.get(tile_type) else {
            return Err(TileboardError::UnknownTileType {
                tile_type: tile_type.clone(),
                authorized: self.authorized_types(),
            });
        };

        let available: BTreeSet<&Variant> = static_variants
            .iter()
            .flat_map(HashMap::keys)
            .chain(
                self.dynamic_tile_configs
                    .get(tile_type)
                    .into_iter()
                    .flat_map(HashMap::keys),
            )
            .collect();

        Err(TileboardError::UnknownVariant {
            tile_type: tile_type.clone(),
            variant: variant.clone(),
            available: keys(available),
        })
    }

    fn authorize(&mut self, tile_type: &TileType) {
        self.tile_configs.entry(tile_type.clone()).or_insert(None);
    }
}

impl Default for ConfigRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConfigRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigRegistry")
            .field("authorized", &self.authorized_types())
            .field("dynamic", &keys(self.dynamic_tile_configs.keys()))
            .finish()
    }
}

/// Join displayable keys into a sorted, comma-separated list.
///
/// Used in error messages so users can see what is actually configured.
pub(crate) fn keys<'a, K, I>(iter: I) -> String
where
    K: fmt::Display + 'a,
    I: IntoIterator<Item = &'a K>,
{
    let mut names: Vec<String> = iter.into_iter().map(|k| k.to_string()).collect();
    names.sort();
    names.join(", ")
}

fn assert_identifiers(tile_type: &TileType, variant: &Variant) {
    assert!(!tile_type.as_str().is_empty(), "tile type must not be empty");
    assert!(
        !variant.as_str().is_empty(),
        "variant of tile type `{}` must not be empty",
        tile_type
    );
}
