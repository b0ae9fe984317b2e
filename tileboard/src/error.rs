//! Request-path error types.

use std::time::Duration;

use thiserror::Error;

use crate::builder::BuildError;
use crate::tile::{TileType, Variant};
use crate::validator::ValidationError;

/// Result type for request-path operations.
pub type Result<T> = std::result::Result<T, TileboardError>;

/// Errors surfaced to callers resolving, validating or building tiles.
///
/// Resolution errors are never masked. Build errors only reach the caller
/// when no cached fallback was usable.
#[derive(Debug, Error)]
pub enum TileboardError {
    /// The tile type was never registered.
    #[error("unknown tile type `{tile_type}` (authorized: {authorized})")]
    UnknownTileType {
        tile_type: TileType,
        authorized: String,
    },

    /// The tile type is authorized but has no dynamic builder.
    #[error("tile type `{tile_type}` is not dynamic (dynamic types: {dynamic})")]
    NotDynamic { tile_type: TileType, dynamic: String },

    /// The tile type is known but the variant is not.
    #[error("unknown variant `{variant}` for tile type `{tile_type}` (available: {available})")]
    UnknownVariant {
        tile_type: TileType,
        variant: Variant,
        available: String,
    },

    /// The validator rejected the params payload.
    #[error("invalid params for tile type `{tile_type}`: {source}")]
    Validation {
        tile_type: TileType,
        #[source]
        source: ValidationError,
    },

    /// The builder did not finish within budget and nothing was cached.
    #[error("building `{tile_type}` ({variant}) timed out after {}ms with no cached result", .budget.as_millis())]
    BuildTimeout {
        tile_type: TileType,
        variant: Variant,
        budget: Duration,
    },

    /// The builder failed and nothing was cached.
    #[error("building `{tile_type}` ({variant}) failed: {source}")]
    BuildFailure {
        tile_type: TileType,
        variant: Variant,
        #[source]
        source: BuildError,
    },
}

impl TileboardError {
    /// True when retrying later may succeed.
    ///
    /// Only timeouts are worth retrying: the downstream system may answer in
    /// time on the next attempt. The system never retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TileboardError::BuildTimeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_variant_display() {
        let err = TileboardError::UnknownVariant {
            tile_type: TileType::new("CI"),
            variant: Variant::new("prod"),
            available: "default, staging".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("`prod`"));
        assert!(msg.contains("default, staging"));
    }

    #[test]
    fn test_not_dynamic_display() {
        let err = TileboardError::NotDynamic {
            tile_type: TileType::new("PING"),
            dynamic: "CI".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "tile type `PING` is not dynamic (dynamic types: CI)"
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_build_timeout_display_and_retryable() {
        let err = TileboardError::BuildTimeout {
            tile_type: TileType::new("CI"),
            variant: Variant::DEFAULT,
            budget: Duration::from_millis(100),
        };
        assert!(err.to_string().contains("100ms"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_validation_error_not_retryable() {
        let err = TileboardError::Validation {
            tile_type: TileType::new("PING"),
            source: ValidationError::NotAnObject,
        };
        assert!(!err.is_retryable());
        assert!(std::error::Error::source(&err).is_some());
    }
}
