//! Dashboard configs: verification and hydration.
//!
//! A dashboard config is the user-facing JSON document listing the tiles to
//! display. Before it is served it goes through two passes, both driven by
//! the [`ConfigRegistry`](crate::registry::ConfigRegistry):
//!
//! 1. [`Verifier`] checks the document: version, known tile types and
//!    variants, structural rules for `EMPTY`/`GROUP`, and every tile's params
//!    against its validator. All problems are collected, not just the first.
//! 2. [`Hydrator`] turns a verified document into what the UI consumes:
//!    static tiles get their URL and initial delay, dynamic tiles are expanded
//!    through the fallback builder.
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "columns": 4,
//!   "tiles": [
//!     { "type": "PING", "params": { "hostname": "example.com" } },
//!     { "type": "GROUP", "label": "CI", "tiles": [
//!       { "type": "CI", "configVariant": "ci1", "params": { "job": "main" } }
//!     ]}
//!   ]
//! }
//! ```

mod hydrate;
mod verify;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tile::{TileType, Variant};

pub use hydrate::{HydratedDashboard, HydratedTile, Hydrator};
pub use verify::Verifier;

/// A user-supplied dashboard config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardConfig {
    /// Config format version, e.g. `"1.0"`.
    #[serde(default)]
    pub version: Option<String>,

    /// Number of grid columns.
    #[serde(default)]
    pub columns: Option<u32>,

    #[serde(default)]
    pub tiles: Vec<TileSpec>,
}

/// One tile of a dashboard config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileSpec {
    #[serde(rename = "type")]
    pub tile_type: TileType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Raw params, checked by the tile's validator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_variant: Option<Variant>,

    /// Sub-tiles, only allowed on `GROUP`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiles: Option<Vec<TileSpec>>,
}

impl TileSpec {
    /// The variant to resolve, falling back to [`Variant::DEFAULT`].
    pub fn variant(&self) -> Variant {
        self.config_variant.clone().unwrap_or_default()
    }
}

/// A problem found in a dashboard config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigIssue {
    /// Location in the document, e.g. `tiles[2].params`.
    pub path: String,
    pub message: String,
}

impl ConfigIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dashboard_config() {
        let config: DashboardConfig = serde_json::from_str(
            r#"{
                "version": "1.0",
                "columns": 4,
                "tiles": [
                    { "type": "EMPTY" },
                    { "type": "GROUP", "label": "CI", "tiles": [
                        { "type": "CI", "configVariant": "ci1", "params": { "job": "main" } }
                    ]}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.version.as_deref(), Some("1.0"));
        assert_eq!(config.tiles[0].tile_type, TileType::EMPTY);
        let group = config.tiles[1].tiles.as_ref().unwrap();
        assert_eq!(group[0].variant(), Variant::new("ci1"));
        assert_eq!(config.tiles[0].variant(), Variant::DEFAULT);
    }

    #[test]
    fn test_issue_display() {
        let issue = ConfigIssue::new("tiles[0].params", "missing params");
        assert_eq!(issue.to_string(), "tiles[0].params: missing params");
    }
}
