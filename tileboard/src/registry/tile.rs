//! Static tile registration and resolution.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::{assert_identifiers, keys, ConfigRegistry};
use crate::error::{Result, TileboardError};
use crate::tile::{TileType, Variant};
use crate::validator::Validator;

/// Configuration of a static tile variant.
#[derive(Clone)]
pub struct TileConfig {
    /// Validates and hydrates the tile's params.
    pub validator: Arc<dyn Validator>,

    /// Route serving the tile, e.g. `/api/v1/ping`.
    pub path: String,

    /// Upper bound of the random delay before the first refresh, so a
    /// dashboard full of tiles does not hit every backend at once.
    pub initial_max_delay: Duration,
}

impl fmt::Debug for TileConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileConfig")
            .field("path", &self.path)
            .field("initial_max_delay", &self.initial_max_delay)
            .finish_non_exhaustive()
    }
}

impl ConfigRegistry {
    /// Register a static tile under the default variant.
    ///
    /// Overwrites any existing default-variant entry for the type.
    ///
    /// # Panics
    ///
    /// See [`register_tile_with_variant`](Self::register_tile_with_variant).
    pub fn register_tile(
        &mut self,
        tile_type: impl Into<TileType>,
        validator: Arc<dyn Validator>,
        path: impl Into<String>,
        initial_max_delay: Duration,
    ) {
        self.register_tile_with_variant(
            tile_type,
            Variant::DEFAULT,
            validator,
            path,
            initial_max_delay,
        );
    }

    /// Register a static tile under an explicit variant.
    ///
    /// # Panics
    ///
    /// Panics if the tile type, variant or path is empty, or if the tile type
    /// is `EMPTY` or `GROUP`.
    pub fn register_tile_with_variant(
        &mut self,
        tile_type: impl Into<TileType>,
        variant: impl Into<Variant>,
        validator: Arc<dyn Validator>,
        path: impl Into<String>,
        initial_max_delay: Duration,
    ) {
        let tile_type = tile_type.into();
        let variant = variant.into();
        let path = path.into();

        assert_identifiers(&tile_type, &variant);
        assert!(
            !tile_type.is_structural(),
            "tile type `{}` is structural and cannot be configured",
            tile_type
        );
        assert!(!path.is_empty(), "path of tile type `{}` must not be empty", tile_type);

        info!(
            tile_type = %tile_type,
            variant = %variant,
            path = %path,
            "Registered tile"
        );

        self.tile_configs
            .entry(tile_type)
            .or_insert(None)
            .get_or_insert_with(HashMap::new)
            .insert(
                variant,
                TileConfig {
                    validator,
                    path,
                    initial_max_delay,
                },
            );
    }

    /// Configuration registered for exactly this variant.
    ///
    /// There is no implicit fallback to the default variant.
    pub fn resolve(&self, tile_type: &TileType, variant: &Variant) -> Option<&TileConfig> {
        self.tile_configs.get(tile_type)?.as_ref()?.get(variant)
    }

    /// Like [`resolve`](Self::resolve), with an error describing what is
    /// registered instead.
    pub fn lookup_tile(&self, tile_type: &TileType, variant: &Variant) -> Result<&TileConfig> {
        let variants = self
            .tile_configs
            .get(tile_type)
            .ok_or_else(|| TileboardError::UnknownTileType {
                tile_type: tile_type.clone(),
                authorized: self.authorized_types(),
            })?;

        variants
            .as_ref()
            .and_then(|v| v.get(variant))
            .ok_or_else(|| TileboardError::UnknownVariant {
                tile_type: tile_type.clone(),
                variant: variant.clone(),
                available: variants.as_ref().map(|v| keys(v.keys())).unwrap_or_default(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::{ValidatedParams, ValidationError};
    use serde_json::Value;

    struct AcceptAll;

    impl Validator for AcceptAll {
        fn validate(&self, _raw: &Value) -> std::result::Result<ValidatedParams, ValidationError> {
            Ok(ValidatedParams::default())
        }
    }

    fn accept_all() -> Arc<dyn Validator> {
        Arc::new(AcceptAll)
    }

    #[test]
    fn test_register_tile_default_variant() {
        let mut registry = ConfigRegistry::new();
        registry.register_tile("PING", accept_all(), "/ping", Duration::from_millis(1700));

        let config = registry
            .resolve(&TileType::new("PING"), &Variant::DEFAULT)
            .unwrap();
        assert_eq!(config.path, "/ping");
        assert_eq!(config.initial_max_delay, Duration::from_millis(1700));
        assert!(registry.is_authorized(&TileType::new("PING")));
    }

    #[test]
    fn test_register_tile_overwrites_same_variant() {
        let mut registry = ConfigRegistry::new();
        registry.register_tile("PING", accept_all(), "/ping/v1", Duration::ZERO);
        registry.register_tile("PING", accept_all(), "/ping/v2", Duration::from_secs(1));

        let config = registry
            .resolve(&TileType::new("PING"), &Variant::DEFAULT)
            .unwrap();
        assert_eq!(config.path, "/ping/v2");
        assert_eq!(config.initial_max_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_variants_coexist_without_default_fallback() {
        let mut registry = ConfigRegistry::new();
        let jenkins = TileType::new("JENKINS-BUILD");
        registry.register_tile_with_variant(
            "JENKINS-BUILD",
            "ci1",
            accept_all(),
            "/jenkins/ci1/build",
            Duration::ZERO,
        );
        registry.register_tile_with_variant(
            "JENKINS-BUILD",
            "ci2",
            accept_all(),
            "/jenkins/ci2/build",
            Duration::ZERO,
        );

        assert_eq!(
            registry.resolve(&jenkins, &Variant::new("ci1")).unwrap().path,
            "/jenkins/ci1/build"
        );
        assert_eq!(
            registry.resolve(&jenkins, &Variant::new("ci2")).unwrap().path,
            "/jenkins/ci2/build"
        );
        assert!(registry.resolve(&jenkins, &Variant::DEFAULT).is_none());
    }

    #[test]
    fn test_lookup_unknown_tile_type() {
        let registry = ConfigRegistry::new();

        let err = registry
            .lookup_tile(&TileType::new("NOPE"), &Variant::DEFAULT)
            .unwrap_err();
        match err {
            TileboardError::UnknownTileType { authorized, .. } => {
                assert_eq!(authorized, "EMPTY, GROUP");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_lookup_unknown_variant_lists_available() {
        let mut registry = ConfigRegistry::new();
        registry.register_tile_with_variant("HTTP", "b", accept_all(), "/http/b", Duration::ZERO);
        registry.register_tile_with_variant("HTTP", "a", accept_all(), "/http/a", Duration::ZERO);

        let err = registry
            .lookup_tile(&TileType::new("HTTP"), &Variant::DEFAULT)
            .unwrap_err();
        match err {
            TileboardError::UnknownVariant { available, .. } => assert_eq!(available, "a, b"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_lookup_structural_type_is_unknown_variant() {
        let registry = ConfigRegistry::new();

        let err = registry
            .lookup_tile(&TileType::GROUP, &Variant::DEFAULT)
            .unwrap_err();
        assert!(matches!(err, TileboardError::UnknownVariant { ref available, .. } if available.is_empty()));
    }

    #[test]
    #[should_panic(expected = "structural")]
    fn test_register_structural_type_panics() {
        let mut registry = ConfigRegistry::new();
        registry.register_tile(TileType::EMPTY, accept_all(), "/empty", Duration::ZERO);
    }

    #[test]
    #[should_panic(expected = "tile type must not be empty")]
    fn test_register_empty_type_panics() {
        let mut registry = ConfigRegistry::new();
        registry.register_tile("", accept_all(), "/x", Duration::ZERO);
    }

    #[test]
    #[should_panic(expected = "path of tile type `PING` must not be empty")]
    fn test_register_empty_path_panics() {
        let mut registry = ConfigRegistry::new();
        registry.register_tile("PING", accept_all(), "", Duration::ZERO);
    }
}
