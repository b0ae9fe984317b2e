//! Dashboard hydration.

use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{ConfigIssue, DashboardConfig, TileSpec};
use crate::fallback::{BuildSource, FallbackBuilder};
use crate::registry::{TileConfig, TileEntry};
use crate::tile::{TileDescriptor, TileType};
use crate::validator::ValidatedParams;

/// A dashboard ready to be rendered.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HydratedDashboard {
    pub columns: u32,
    pub tiles: Vec<HydratedTile>,
    /// Tiles that could not be hydrated. They are left out of `tiles`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<ConfigIssue>,
}

/// A tile the UI can render.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HydratedTile {
    #[serde(rename = "type")]
    pub tile_type: TileType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Route with encoded params, unset for structural tiles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Initial refresh delay bound in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_max_delay: Option<u64>,

    /// True when the tile comes from a cached dynamic build.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stale: bool,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tiles: Vec<HydratedTile>,
}

impl HydratedTile {
    fn structural(tile_type: TileType, label: Option<String>) -> Self {
        Self {
            tile_type,
            label,
            url: None,
            initial_max_delay: None,
            stale: false,
            tiles: Vec::new(),
        }
    }
}

/// Turns verified dashboard configs into [`HydratedDashboard`]s.
///
/// Dynamic tiles are expanded in place through the [`FallbackBuilder`],
/// using its default budget.
pub struct Hydrator<'a> {
    fallback: &'a FallbackBuilder,
}

impl<'a> Hydrator<'a> {
    pub fn new(fallback: &'a FallbackBuilder) -> Self {
        Self { fallback }
    }

    /// Hydrate every tile of `config`.
    ///
    /// Top-level tiles are hydrated concurrently; order is preserved.
    pub async fn hydrate(&self, config: &DashboardConfig) -> HydratedDashboard {
        let entries = config
            .tiles
            .iter()
            .enumerate()
            .map(|(i, tile)| self.hydrate_entry(tile, format!("tiles[{i}]")));

        let mut tiles = Vec::new();
        let mut issues = Vec::new();
        for (hydrated, problems) in join_all(entries).await {
            tiles.extend(hydrated);
            issues.extend(problems);
        }

        debug!(
            tiles = tiles.len(),
            issues = issues.len(),
            "Hydrated dashboard"
        );
        HydratedDashboard {
            columns: config.columns.unwrap_or(1),
            tiles,
            issues,
        }
    }

    async fn hydrate_entry(
        &self,
        tile: &TileSpec,
        path: String,
    ) -> (Vec<HydratedTile>, Vec<ConfigIssue>) {
        if tile.tile_type != TileType::GROUP {
            return self.hydrate_leaf(tile, path).await;
        }

        let children = tile.tiles.as_deref().unwrap_or_default();
        let hydrated = join_all(
            children
                .iter()
                .enumerate()
                .map(|(i, child)| self.hydrate_leaf(child, format!("{path}.tiles[{i}]"))),
        )
        .await;

        let mut group = HydratedTile::structural(TileType::GROUP, tile.label.clone());
        let mut issues = Vec::new();
        for (tiles, problems) in hydrated {
            group.tiles.extend(tiles);
            issues.extend(problems);
        }
        (vec![group], issues)
    }

    /// Hydrate a tile that is not a `GROUP`. Dynamic tiles may expand to
    /// any number of tiles.
    async fn hydrate_leaf(
        &self,
        tile: &TileSpec,
        path: String,
    ) -> (Vec<HydratedTile>, Vec<ConfigIssue>) {
        if tile.tile_type == TileType::EMPTY {
            return (
                vec![HydratedTile::structural(
                    TileType::EMPTY,
                    tile.label.clone(),
                )],
                Vec::new(),
            );
        }
        if tile.tile_type == TileType::GROUP {
            return (
                Vec::new(),
                vec![ConfigIssue::new(
                    format!("{path}.type"),
                    "GROUP tiles cannot be nested",
                )],
            );
        }

        let variant = tile.variant();
        let params = tile.params.clone().unwrap_or(Value::Null);
        let registry = self.fallback.registry();

        let dynamic = match registry.lookup_entry(&tile.tile_type, &variant) {
            Ok(TileEntry::Dynamic(dynamic)) => dynamic,
            Ok(TileEntry::Static(config)) => {
                return match hydrate_static(&tile.tile_type, config, tile.label.clone(), &params) {
                    Ok(hydrated) => (vec![hydrated], Vec::new()),
                    Err(message) => (Vec::new(), vec![ConfigIssue::new(path, message)]),
                };
            }
            Err(e) => return (Vec::new(), vec![ConfigIssue::new(path, e.to_string())]),
        };

        let validated = match dynamic.validator.validate(&params) {
            Ok(validated) => validated,
            Err(e) => {
                return (
                    Vec::new(),
                    vec![ConfigIssue::new(format!("{path}.params"), e.to_string())],
                )
            }
        };

        let outcome = match self
            .fallback
            .build_with_fallback(
                &tile.tile_type,
                &variant,
                &validated,
                self.fallback.default_budget(),
            )
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(tile_type = %tile.tile_type, error = %e, "Dynamic tile dropped");
                return (Vec::new(), vec![ConfigIssue::new(path, e.to_string())]);
            }
        };

        let stale = outcome.source == BuildSource::Cached;
        let mut tiles = Vec::with_capacity(outcome.tiles.len());
        let mut issues = Vec::new();
        for (i, descriptor) in outcome.tiles.into_iter().enumerate() {
            match self.hydrate_descriptor(descriptor) {
                Ok(mut hydrated) => {
                    hydrated.stale = stale;
                    tiles.push(hydrated);
                }
                Err(message) => issues.push(ConfigIssue::new(format!("{path}[{i}]"), message)),
            }
        }
        (tiles, issues)
    }

    /// Hydrate a tile produced by a dynamic builder. It must resolve to a
    /// static variant.
    fn hydrate_descriptor(&self, descriptor: TileDescriptor) -> Result<HydratedTile, String> {
        let registry = self.fallback.registry();
        let variant = descriptor.variant();
        if descriptor.tile_type.is_structural()
            || registry
                .resolve_dynamic(&descriptor.tile_type, &variant)
                .is_some()
        {
            return Err(format!(
                "built tile `{}` ({}) must be a static tile",
                descriptor.tile_type, variant
            ));
        }

        let config = registry
            .lookup_tile(&descriptor.tile_type, &variant)
            .map_err(|e| e.to_string())?;
        hydrate_static(
            &descriptor.tile_type,
            config,
            descriptor.label,
            &Value::Object(descriptor.params),
        )
    }
}

fn hydrate_static(
    tile_type: &TileType,
    config: &TileConfig,
    label: Option<String>,
    params: &Value,
) -> Result<HydratedTile, String> {
    let validated = config.validator.validate(params).map_err(|e| e.to_string())?;

    Ok(HydratedTile {
        tile_type: tile_type.clone(),
        label,
        url: Some(tile_url(&config.path, &validated)),
        initial_max_delay: Some(config.initial_max_delay.as_millis() as u64),
        stale: false,
        tiles: Vec::new(),
    })
}

/// `path?k=v&...` with keys sorted. Arrays repeat their key, nulls are
/// skipped, nested objects are sent as JSON.
fn tile_url(path: &str, params: &ValidatedParams) -> String {
    let mut entries: Vec<_> = params.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    let mut query = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in entries {
        match value {
            Value::Array(items) => {
                for item in items {
                    append_value(&mut query, key, item);
                }
            }
            other => append_value(&mut query, key, other),
        }
    }

    let query = query.finish();
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{query}")
    }
}

fn append_value(
    query: &mut url::form_urlencoded::Serializer<'_, String>,
    key: &str,
    value: &Value,
) {
    match value {
        Value::Null => {}
        Value::String(s) => {
            query.append_pair(key, s);
        }
        other => {
            query.append_pair(key, &other.to_string());
        }
    }
}
