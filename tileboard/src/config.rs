//! Startup settings.
//!
//! Settings are read from an INI file (default `~/.tileboard/config.ini`)
//! and can be overridden by environment variables:
//!
//! ```ini
//! [cache]
//! downstream_store_expiration_ms = 120000
//! max_size_bytes = 67108864
//!
//! [builds]
//! budget_ms = 2000
//! max_concurrent_per_type = 8
//!
//! [logging]
//! level = info
//! file = /var/log/tileboard.log
//! ```
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `TILEBOARD_DOWNSTREAM_STORE_EXPIRATION` | `cache.downstream_store_expiration_ms` |
//! | `TILEBOARD_BUILD_BUDGET` | `builds.budget_ms` |
//! | `TILEBOARD_LOG_LEVEL` | `logging.level` |
//!
//! Missing keys keep their defaults.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

/// Default expiration of cached build results (2 minutes).
pub const DEFAULT_DOWNSTREAM_STORE_EXPIRATION_MS: u64 = 120_000;

/// Default size bound of the build result store (64 MiB).
pub const DEFAULT_CACHE_MAX_SIZE_BYTES: u64 = 64 * 1024 * 1024;

/// Default time a caller waits for a dynamic tile build.
pub const DEFAULT_BUILD_BUDGET_MS: u64 = 2_000;

/// Default bound on concurrent builds per tile type.
pub const DEFAULT_MAX_CONCURRENT_BUILDS_PER_TYPE: usize = 8;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

const ENV_DOWNSTREAM_STORE_EXPIRATION: &str = "TILEBOARD_DOWNSTREAM_STORE_EXPIRATION";
const ENV_BUILD_BUDGET: &str = "TILEBOARD_BUILD_BUDGET";
const ENV_LOG_LEVEL: &str = "TILEBOARD_LOG_LEVEL";

/// Errors that can occur while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file could not be read or parsed.
    #[error("failed to load {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    /// A value is not valid for its key.
    #[error("invalid value `{value}` for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Build result store settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Expiration of each stored build result.
    pub downstream_store_expiration: Duration,
    /// Size bound of the store in bytes.
    pub max_size_bytes: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            downstream_store_expiration: Duration::from_millis(
                DEFAULT_DOWNSTREAM_STORE_EXPIRATION_MS,
            ),
            max_size_bytes: DEFAULT_CACHE_MAX_SIZE_BYTES,
        }
    }
}

/// Dynamic tile build settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    /// How long a caller waits for a fresh build before falling back.
    pub budget: Duration,
    /// Bound on builds in flight per tile type, abandoned ones included.
    pub max_concurrent_per_type: usize,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            budget: Duration::from_millis(DEFAULT_BUILD_BUDGET_MS),
            max_concurrent_per_type: DEFAULT_MAX_CONCURRENT_BUILDS_PER_TYPE,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Filter directive, e.g. `info` or `tileboard=debug`.
    pub level: String,
    /// Optional log file; logs go to stderr when unset.
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

/// All startup settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub cache: CacheSettings,
    pub builds: BuildSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Load settings from the default file if it exists, then apply
    /// environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = match default_settings_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        settings.apply_overrides(std::env::vars())?;
        Ok(settings)
    }

    /// Load settings from an INI file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    /// Parse settings from INI text.
    pub fn from_ini_str(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Load {
            path: PathBuf::from("<string>"),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut settings = Self::default();

        if let Some(section) = ini.section(Some("cache")) {
            if let Some(value) = section.get("downstream_store_expiration_ms") {
                settings.cache.downstream_store_expiration =
                    parse_millis("cache.downstream_store_expiration_ms", value)?;
            }
            if let Some(value) = section.get("max_size_bytes") {
                settings.cache.max_size_bytes = parse_positive("cache.max_size_bytes", value)?;
            }
        }

        if let Some(section) = ini.section(Some("builds")) {
            if let Some(value) = section.get("budget_ms") {
                settings.builds.budget = parse_millis("builds.budget_ms", value)?;
            }
            if let Some(value) = section.get("max_concurrent_per_type") {
                settings.builds.max_concurrent_per_type =
                    parse_positive("builds.max_concurrent_per_type", value)?;
            }
        }

        if let Some(section) = ini.section(Some("logging")) {
            if let Some(value) = section.get("level") {
                settings.logging.level = value.trim().to_string();
            }
            if let Some(value) = section.get("file") {
                let value = value.trim();
                settings.logging.file = (!value.is_empty()).then(|| PathBuf::from(value));
            }
        }

        Ok(settings)
    }

    /// Apply `TILEBOARD_*` overrides from the given variables.
    ///
    /// Unrelated variables are ignored.
    pub fn apply_overrides<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            match key.as_str() {
                ENV_DOWNSTREAM_STORE_EXPIRATION => {
                    self.cache.downstream_store_expiration = parse_millis(&key, &value)?;
                }
                ENV_BUILD_BUDGET => {
                    self.builds.budget = parse_millis(&key, &value)?;
                }
                ENV_LOG_LEVEL => {
                    self.logging.level = value.trim().to_string();
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Default settings file location: `~/.tileboard/config.ini`.
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".tileboard").join("config.ini"))
}

fn parse_positive<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr + PartialEq + Default,
    T::Err: std::fmt::Display,
{
    let parsed: T = value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })?;

    if parsed == T::default() {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(parsed)
}

fn parse_millis(key: &str, value: &str) -> Result<Duration, ConfigError> {
    parse_positive::<u64>(key, value).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(
            settings.cache.downstream_store_expiration,
            Duration::from_secs(120)
        );
        assert_eq!(settings.builds.budget, Duration::from_secs(2));
        assert_eq!(settings.builds.max_concurrent_per_type, 8);
        assert_eq!(settings.logging.level, "info");
        assert!(settings.logging.file.is_none());
    }

    #[test]
    fn test_from_ini_str_overrides_defaults() {
        let settings = Settings::from_ini_str(
            "[cache]\n\
             downstream_store_expiration_ms = 5000\n\
             [builds]\n\
             budget_ms = 250\n\
             max_concurrent_per_type = 2\n\
             [logging]\n\
             level = tileboard=debug\n\
             file = /tmp/tileboard.log\n",
        )
        .unwrap();

        assert_eq!(
            settings.cache.downstream_store_expiration,
            Duration::from_secs(5)
        );
        assert_eq!(settings.cache.max_size_bytes, DEFAULT_CACHE_MAX_SIZE_BYTES);
        assert_eq!(settings.builds.budget, Duration::from_millis(250));
        assert_eq!(settings.builds.max_concurrent_per_type, 2);
        assert_eq!(settings.logging.level, "tileboard=debug");
        assert_eq!(
            settings.logging.file,
            Some(PathBuf::from("/tmp/tileboard.log"))
        );
    }

    #[test]
    fn test_invalid_number_rejected() {
        let err = Settings::from_ini_str("[builds]\nbudget_ms = soon\n").unwrap_err();
        match err {
            ConfigError::InvalidValue { key, value, .. } => {
                assert_eq!(key, "builds.budget_ms");
                assert_eq!(value, "soon");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_zero_duration_rejected() {
        let err =
            Settings::from_ini_str("[cache]\ndownstream_store_expiration_ms = 0\n").unwrap_err();
        assert!(err.to_string().contains("must be greater than zero"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[builds]\nbudget_ms = 750").unwrap();

        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.builds.budget, Duration::from_millis(750));
    }

    #[test]
    fn test_from_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::from_file(&dir.path().join("missing.ini")).unwrap_err();
        assert!(matches!(err, ConfigError::Load { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        settings
            .apply_overrides(vec![
                ("TILEBOARD_BUILD_BUDGET".to_string(), "300".to_string()),
                (
                    "TILEBOARD_DOWNSTREAM_STORE_EXPIRATION".to_string(),
                    "60000".to_string(),
                ),
                ("TILEBOARD_LOG_LEVEL".to_string(), "warn".to_string()),
                ("PATH".to_string(), "/usr/bin".to_string()),
            ])
            .unwrap();

        assert_eq!(settings.builds.budget, Duration::from_millis(300));
        assert_eq!(
            settings.cache.downstream_store_expiration,
            Duration::from_secs(60)
        );
        assert_eq!(settings.logging.level, "warn");
    }

    #[test]
    fn test_env_override_invalid() {
        let mut settings = Settings::default();
        let err = settings
            .apply_overrides(vec![("TILEBOARD_BUILD_BUDGET".to_string(), "-1".to_string())])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
