//! `salon.toml` configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use salon_core::booking::{DEFAULT_ONLINE_DISCOUNT_PERCENT, DEFAULT_SLOT_MINUTES};
use salon_core::BookingPolicy;
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_FILE: &str = "salon.toml";

const MAX_WINDOW_DAYS: u32 = 366;
const MAX_STORE_RETRIES: u32 = 10;
const MAX_RETRY_BACKOFF_MS: u64 = 60_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub shop: ShopConfig,
    pub booking: BookingConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ShopConfig {
    pub name: String,
    /// Phone number in international format, digits only, for wa.me links
    pub whatsapp: Option<String>,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            name: "Salon".to_string(),
            whatsapp: None,
        }
    }
}

/// Which store the booking path writes to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreMode {
    #[default]
    Durable,
    Local,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BookingConfig {
    pub slot_minutes: u32,
    pub online_discount_percent: u32,
    /// Zero disables the window
    pub window_days: u32,
    pub mode: StoreMode,
    pub store_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            slot_minutes: DEFAULT_SLOT_MINUTES,
            online_discount_percent: DEFAULT_ONLINE_DISCOUNT_PERCENT,
            window_days: 7,
            mode: StoreMode::Durable,
            store_retries: 3,
            retry_backoff_ms: 100,
        }
    }
}

impl BookingConfig {
    pub fn policy(&self) -> BookingPolicy {
        BookingPolicy {
            slot_minutes: self.slot_minutes,
            online_discount_percent: self.online_discount_percent,
            window_days: (self.window_days > 0).then_some(self.window_days),
        }
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Defaults to `salon.db` in the data directory
    pub database_path: Option<PathBuf>,
    /// Defaults to `salon-local.json` in the data directory
    pub local_snapshot_path: Option<PathBuf>,
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            local_snapshot_path: None,
            busy_timeout_ms: 5000,
        }
    }
}

impl StorageConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Config {
    /// Read `path`; a missing file gives the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let config = Self::from_toml(&raw).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        tracing::info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: PathBuf::from(CONFIG_FILE),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.booking.slot_minutes == 0 || self.booking.slot_minutes > 24 * 60 {
            return Err(ConfigError::Invalid(format!(
                "booking.slot_minutes must be between 1 and 1440, got {}",
                self.booking.slot_minutes
            )));
        }
        if self.booking.online_discount_percent > 100 {
            return Err(ConfigError::Invalid(format!(
                "booking.online_discount_percent must be at most 100, got {}",
                self.booking.online_discount_percent
            )));
        }
        if self.booking.window_days > MAX_WINDOW_DAYS {
            return Err(ConfigError::Invalid(format!(
                "booking.window_days must be at most {MAX_WINDOW_DAYS}, got {}",
                self.booking.window_days
            )));
        }
        if self.booking.store_retries > MAX_STORE_RETRIES {
            return Err(ConfigError::Invalid(format!(
                "booking.store_retries must be at most {MAX_STORE_RETRIES}, got {}",
                self.booking.store_retries
            )));
        }
        if self.booking.retry_backoff_ms > MAX_RETRY_BACKOFF_MS {
            return Err(ConfigError::Invalid(format!(
                "booking.retry_backoff_ms must be at most {MAX_RETRY_BACKOFF_MS}, got {}",
                self.booking.retry_backoff_ms
            )));
        }
        if let Some(number) = &self.shop.whatsapp {
            if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
                return Err(ConfigError::Invalid(
                    "shop.whatsapp must be digits only".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());

        let policy = config.booking.policy();
        assert_eq!(policy.slot_minutes, 30);
        assert_eq!(policy.online_discount_percent, 5);
        assert_eq!(policy.window_days, Some(7));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_toml(
            r#"
            [shop]
            name = "Barbería Lucas"
            whatsapp = "5493870000000"

            [booking]
            mode = "local"
            window_days = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.shop.name, "Barbería Lucas");
        assert_eq!(config.booking.mode, StoreMode::Local);
        assert_eq!(config.booking.policy().window_days, None);
        assert_eq!(config.booking.store_retries, 3);
        assert_eq!(config.storage.busy_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(
            Config::from_toml("[booking]\nslot_minutes = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_toml("[booking]\nonline_discount_percent = 150"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_toml("[booking]\nmode = \"cloud\""),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn out_of_range_limits_are_rejected() {
        for raw in [
            "[booking]\nwindow_days = 200000000",
            "[booking]\nretry_backoff_ms = 9223372036854775807",
            "[booking]\nstore_retries = 1000",
        ] {
            assert!(
                matches!(Config::from_toml(raw), Err(ConfigError::Invalid(_))),
                "{raw} should be rejected"
            );
        }
        assert!(Config::from_toml("[booking]\nwindow_days = 366").is_ok());
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, Config::default());
    }
}
