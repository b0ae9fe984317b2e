//! Dashboard config format versions.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A `major.minor` dashboard config version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConfigVersion {
    pub major: u32,
    pub minor: u32,
}

/// Error parsing a config version.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid config version `{0}`, expected `major.minor`")]
pub struct ParseVersionError(pub String);

impl ConfigVersion {
    /// Initial format.
    pub const V1_0: ConfigVersion = ConfigVersion::new(1, 0);

    /// Newest version this build understands.
    pub const CURRENT: ConfigVersion = Self::V1_0;

    /// Oldest version this build still accepts.
    pub const MINIMAL: ConfigVersion = Self::V1_0;

    /// Create a version.
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Returns true if `MINIMAL <= self <= CURRENT`.
    pub fn is_supported(&self) -> bool {
        (Self::MINIMAL..=Self::CURRENT).contains(self)
    }
}

impl FromStr for ConfigVersion {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseVersionError(s.to_string());
        let (major, minor) = s.trim().split_once('.').ok_or_else(err)?;
        Ok(Self {
            major: major.parse().map_err(|_| err())?,
            minor: minor.parse().map_err(|_| err())?,
        })
    }
}

impl fmt::Display for ConfigVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let v: ConfigVersion = "1.0".parse().unwrap();
        assert_eq!(v, ConfigVersion::V1_0);
        assert_eq!(v.to_string(), "1.0");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for input in ["1", "1.x", "", "a.b", "1.0.0"] {
            assert!(input.parse::<ConfigVersion>().is_err(), "accepted {input:?}");
        }
    }

    #[test]
    fn test_ordering_is_numeric() {
        let v1_2: ConfigVersion = "1.2".parse().unwrap();
        let v1_10: ConfigVersion = "1.10".parse().unwrap();
        assert!(v1_2 < v1_10);
    }

    #[test]
    fn test_supported_range() {
        assert!(ConfigVersion::CURRENT.is_supported());
        assert!(!ConfigVersion::new(0, 9).is_supported());
        assert!(!ConfigVersion::new(2, 0).is_supported());
    }
}
