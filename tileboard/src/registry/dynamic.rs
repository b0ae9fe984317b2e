//! Dynamic tile registration and resolution.

use std::fmt;
use std::sync::Arc;

use tracing::info;

use super::{assert_identifiers, keys, ConfigRegistry};
use crate::builder::DynamicTileBuilder;
use crate::error::{Result, TileboardError};
use crate::tile::{TileType, Variant};
use crate::validator::Validator;

/// Configuration of a dynamic tile variant.
#[derive(Clone)]
pub struct DynamicTileConfig {
    /// Validates and hydrates the tile's params.
    pub validator: Arc<dyn Validator>,

    /// Expands the tile into concrete sub-tiles.
    pub builder: Arc<dyn DynamicTileBuilder>,
}

impl fmt::Debug for DynamicTileConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicTileConfig").finish_non_exhaustive()
    }
}

impl ConfigRegistry {
    /// Register a dynamic tile under the default variant.
    pub fn register_dynamic_tile(
        &mut self,
        tile_type: impl Into<TileType>,
        validator: Arc<dyn Validator>,
        builder: Arc<dyn DynamicTileBuilder>,
    ) {
        self.register_dynamic_tile_with_variant(tile_type, Variant::DEFAULT, validator, builder);
    }

    /// Register a dynamic tile under an explicit variant.
    ///
    /// Also authorizes the tile type in the static table. Static variants
    /// already registered for the type are kept.
    ///
    /// # Panics
    ///
    /// Panics if the tile type or variant is empty, or if the tile type is
    /// `EMPTY` or `GROUP`.
    pub fn register_dynamic_tile_with_variant(
        &mut self,
        tile_type: impl Into<TileType>,
        variant: impl Into<Variant>,
        validator: Arc<dyn Validator>,
        builder: Arc<dyn DynamicTileBuilder>,
    ) {
        let tile_type = tile_type.into();
        let variant = variant.into();

        assert_identifiers(&tile_type, &variant);
        assert!(
            !tile_type.is_structural(),
            "tile type `{}` is structural and cannot be configured",
            tile_type
        );

        info!(tile_type = %tile_type, variant = %variant, "Registered dynamic tile");

        self.authorize(&tile_type);
        self.dynamic_tile_configs
            .entry(tile_type)
            .or_default()
            .insert(variant, DynamicTileConfig { validator, builder });
    }

    /// Dynamic configuration registered for exactly this variant.
    pub fn resolve_dynamic(
        &self,
        tile_type: &TileType,
        variant: &Variant,
    ) -> Option<&DynamicTileConfig> {
        self.dynamic_tile_configs.get(tile_type)?.get(variant)
    }

    /// Like [`resolve_dynamic`](Self::resolve_dynamic), with an error
    /// describing what is registered instead.
    pub fn lookup_dynamic(
        &self,
        tile_type: &TileType,
        variant: &Variant,
    ) -> Result<&DynamicTileConfig> {
        let variants = match self.dynamic_tile_configs.get(tile_type) {
            Some(variants) => variants,
            None if self.is_authorized(tile_type) => {
                return Err(TileboardError::NotDynamic {
                    tile_type: tile_type.clone(),
                    dynamic: keys(self.dynamic_tile_configs.keys()),
                });
            }
            None => {
                return Err(TileboardError::UnknownTileType {
                    tile_type: tile_type.clone(),
                    authorized: self.authorized_types(),
                });
            }
        };

        variants
            .get(variant)
            .ok_or_else(|| TileboardError::UnknownVariant {
                tile_type: tile_type.clone(),
                variant: variant.clone(),
                available: keys(variants.keys()),
            })
    }
}
