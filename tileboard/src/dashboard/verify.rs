//! Dashboard config verification.

use serde_json::Value;
use tracing::debug;

use super::{ConfigIssue, DashboardConfig, TileSpec};
use crate::registry::ConfigRegistry;
use crate::tile::TileType;
use crate::version::ConfigVersion;

/// Checks dashboard configs against a registry.
pub struct Verifier<'a> {
    registry: &'a ConfigRegistry,
}

impl<'a> Verifier<'a> {
    pub fn new(registry: &'a ConfigRegistry) -> Self {
        Self { registry }
    }

    /// Collect every problem in `config`. An empty list means the config
    /// can be hydrated.
    pub fn verify(&self, config: &DashboardConfig) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        self.verify_version(config.version.as_deref(), &mut issues);

        if config.columns.unwrap_or(0) == 0 {
            issues.push(ConfigIssue::new("columns", "columns must be greater than 0"));
        }

        if config.tiles.is_empty() {
            issues.push(ConfigIssue::new("tiles", "at least one tile is required"));
        }
        for (i, tile) in config.tiles.iter().enumerate() {
            self.verify_tile(tile, &format!("tiles[{i}]"), false, &mut issues);
        }

        debug!(issues = issues.len(), "Verified dashboard config");
        issues
    }

    fn verify_version(&self, version: Option<&str>, issues: &mut Vec<ConfigIssue>) {
        let Some(raw) = version else {
            issues.push(ConfigIssue::new(
                "version",
                format!("missing version (current: {})", ConfigVersion::CURRENT),
            ));
            return;
        };

        match raw.parse::<ConfigVersion>() {
            Ok(v) if v.is_supported() => {}
            Ok(v) => issues.push(ConfigIssue::new(
                "version",
                format!(
                    "unsupported version {} (supported: {} to {})",
                    v,
                    ConfigVersion::MINIMAL,
                    ConfigVersion::CURRENT
                ),
            )),
            Err(e) => issues.push(ConfigIssue::new("version", e.to_string())),
        }
    }

    fn verify_tile(
        &self,
        tile: &TileSpec,
        path: &str,
        in_group: bool,
        issues: &mut Vec<ConfigIssue>,
    ) {
        if !self.registry.is_authorized(&tile.tile_type) {
            issues.push(ConfigIssue::new(
                format!("{path}.type"),
                format!(
                    "unknown tile type `{}` (authorized: {})",
                    tile.tile_type,
                    self.registry.authorized_types()
                ),
            ));
            return;
        }

        if tile.tile_type == TileType::EMPTY {
            if tile.params.is_some() {
                issues.push(ConfigIssue::new(
                    format!("{path}.params"),
                    "EMPTY tiles cannot have params",
                ));
            }
            if tile.tiles.is_some() {
                issues.push(ConfigIssue::new(
                    format!("{path}.tiles"),
                    "EMPTY tiles cannot have tiles",
                ));
            }
            return;
        }

        if tile.tile_type == TileType::GROUP {
            self.verify_group(tile, path, in_group, issues);
            return;
        }

        if tile.tiles.is_some() {
            issues.push(ConfigIssue::new(
                format!("{path}.tiles"),
                "only GROUP tiles can have tiles",
            ));
        }

        let Some(params) = &tile.params else {
            issues.push(ConfigIssue::new(format!("{path}.params"), "missing params"));
            return;
        };

        self.verify_params(tile, params, path, issues);
    }

    fn verify_group(
        &self,
        tile: &TileSpec,
        path: &str,
        in_group: bool,
        issues: &mut Vec<ConfigIssue>,
    ) {
        if in_group {
            issues.push(ConfigIssue::new(
                format!("{path}.type"),
                "GROUP tiles cannot be nested",
            ));
            return;
        }
        if tile.params.is_some() {
            issues.push(ConfigIssue::new(
                format!("{path}.params"),
                "GROUP tiles cannot have params",
            ));
        }

        match &tile.tiles {
            Some(children) if !children.is_empty() => {
                for (i, child) in children.iter().enumerate() {
                    self.verify_tile(child, &format!("{path}.tiles[{i}]"), true, issues);
                }
            }
            _ => issues.push(ConfigIssue::new(
                format!("{path}.tiles"),
                "GROUP tiles need at least one tile",
            )),
        }
    }

    fn verify_params(
        &self,
        tile: &TileSpec,
        params: &Value,
        path: &str,
        issues: &mut Vec<ConfigIssue>,
    ) {
        let entry = match self.registry.lookup_entry(&tile.tile_type, &tile.variant()) {
            Ok(entry) => entry,
            Err(e) => {
                issues.push(ConfigIssue::new(format!("{path}.configVariant"), e.to_string()));
                return;
            }
        };

        if let Err(e) = entry.validator().validate(params) {
            issues.push(ConfigIssue::new(format!("{path}.params"), e.to_string()));
        }
    }
}
