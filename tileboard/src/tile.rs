//! Tile identifiers and descriptors.
//!
//! A [`TileType`] names a kind of tile ("PING", "CI", ...). A [`Variant`]
//! distinguishes several configurations of the same type, for example two
//! deployments of the same CI server. [`TileDescriptor`] is what dynamic
//! builders produce: a concrete sub-tile ready for hydration.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque identifier of a tile kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileType(Cow<'static, str>);

impl TileType {
    /// Structural pseudo-tile used as a blank slot in the grid.
    pub const EMPTY: TileType = TileType(Cow::Borrowed("EMPTY"));

    /// Structural pseudo-tile grouping other tiles.
    pub const GROUP: TileType = TileType(Cow::Borrowed("GROUP"));

    /// Create a tile type from any string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// The tile type as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for `EMPTY` and `GROUP`, which never carry configuration.
    pub fn is_structural(&self) -> bool {
        *self == Self::EMPTY || *self == Self::GROUP
    }
}

impl fmt::Display for TileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TileType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Named alternative configuration of a tile type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Variant(Cow<'static, str>);

impl Variant {
    /// Variant used by tile types with a single configuration.
    pub const DEFAULT: Variant = Variant(Cow::Borrowed("default"));

    /// Create a variant from any string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// The variant as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Variant {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Variant {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A concrete tile produced by a dynamic builder.
///
/// Serialized as JSON when stored in the fallback cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileDescriptor {
    /// Type of the produced tile. Must be a static tile type.
    #[serde(rename = "type")]
    pub tile_type: TileType,

    /// Display label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Raw params, validated during hydration like any user-supplied tile.
    #[serde(default)]
    pub params: Map<String, Value>,

    /// Variant of `tile_type` to resolve, default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_variant: Option<Variant>,
}

impl TileDescriptor {
    /// Create a descriptor for the given tile type with no params.
    pub fn new(tile_type: impl Into<TileType>) -> Self {
        Self {
            tile_type: tile_type.into(),
            label: None,
            params: Map::new(),
            config_variant: None,
        }
    }

    /// Set the display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Add a param.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Select a non-default variant.
    pub fn with_variant(mut self, variant: impl Into<Variant>) -> Self {
        self.config_variant = Some(variant.into());
        self
    }

    /// The variant to resolve, falling back to [`Variant::DEFAULT`].
    pub fn variant(&self) -> Variant {
        self.config_variant.clone().unwrap_or_default()
    }
}
