//! Configuration loading
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `PARKCAST_CONFIG` environment variable
//! 3. `<config_dir>/parkcast/parkcast.toml`
//! 4. Compiled defaults (fallback)
//!
//! A missing file never stops startup: a warning is logged and compiled
//! defaults are used. Individual paths can be overridden through
//! `PARKCAST_METADATA_PATH`, `PARKCAST_MODEL_PATH` and `PARKCAST_BIND`.

use crate::types::{EventContext, WeatherSnapshot};
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const CONFIG_ENV: &str = "PARKCAST_CONFIG";
pub const METADATA_PATH_ENV: &str = "PARKCAST_METADATA_PATH";
pub const MODEL_PATH_ENV: &str = "PARKCAST_MODEL_PATH";
pub const BIND_ENV: &str = "PARKCAST_BIND";

/// Complete parkcast configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParkcastConfig {
    /// Extra local closing days (ISO dates) treated as holidays
    pub extra_holidays: Vec<NaiveDate>,
    pub sources: SourcesConfig,
    pub weather: WeatherConfig,
    pub defaults: DefaultsConfig,
    pub events: EventContext,
    pub paths: PathsConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Live occupancy sources, tried JSON → HTML → static file
///
/// An empty URL disables that source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    #[serde(with = "empty_disables")]
    pub json_url: Option<String>,
    #[serde(with = "empty_disables")]
    pub html_url: Option<String>,
    pub static_file: Option<PathBuf>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Lifetime of the last successful fetch in seconds (0 disables caching)
    pub cache_ttl_secs: u64,
    pub user_agent: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            json_url: Some("https://www.dresden.de/apps_ext/ParkplatzApp/data.json".to_string()),
            html_url: Some("https://www.dresden.de/apps_ext/ParkplatzApp/index".to_string()),
            static_file: None,
            timeout_secs: 5,
            cache_ttl_secs: 60,
            user_agent: format!("parkcast/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Weather sources, tried API → scraped page
///
/// An empty URL disables that source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    #[serde(with = "empty_disables")]
    pub api_url: Option<String>,
    #[serde(with = "empty_disables")]
    pub page_url: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_url: Some("https://api.open-meteo.com/v1/forecast".to_string()),
            page_url: None,
            latitude: 51.0504,
            longitude: 13.7373,
            timezone: "Europe/Berlin".to_string(),
        }
    }
}

/// Values substituted when every source of a category fails
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub precipitation_mm: f64,
    pub description: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        let w = WeatherSnapshot::fallback();
        Self {
            temperature_c: w.temperature_c,
            humidity_pct: w.humidity_pct,
            precipitation_mm: w.precipitation_mm,
            description: w.description,
        }
    }
}

impl DefaultsConfig {
    pub fn weather(&self) -> WeatherSnapshot {
        WeatherSnapshot {
            temperature_c: self.temperature_c,
            humidity_pct: self.humidity_pct,
            precipitation_mm: self.precipitation_mm,
            description: self.description.clone(),
            observed_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Coordinate/metadata CSV
    pub metadata: PathBuf,
    /// Predictor artifact (JSON)
    pub model: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            metadata: PathBuf::from("coordinates.csv"),
            model: PathBuf::from("trained_model.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5730".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ParkcastConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Serialize the effective configuration
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))
    }

    /// Resolve, read and parse configuration, then apply env overrides
    ///
    /// A file that is named explicitly but fails to parse is an error; a
    /// missing file falls back to defaults.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let mut config = match resolve_config_path(cli_path) {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(&path)?;
                let config = Self::from_toml_str(&content)?;
                info!("Configuration loaded from {}", path.display());
                config
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using compiled defaults",
                    path.display()
                );
                Self::default()
            }
            None => {
                info!("No config file found, using compiled defaults");
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `PARKCAST_*` path/bind overrides
    pub fn apply_env_overrides(&mut self) {
        if let Some(path) = non_empty_env(METADATA_PATH_ENV) {
            self.paths.metadata = PathBuf::from(path);
        }
        if let Some(path) = non_empty_env(MODEL_PATH_ENV) {
            self.paths.model = PathBuf::from(path);
        }
        if let Some(bind) = non_empty_env(BIND_ENV) {
            self.server.bind = bind;
        }
    }
}

/// Pick the config file path by priority; `None` when nothing is configured
/// and no file exists at the platform default location
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }
    if let Some(path) = non_empty_env(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    default_config_path().filter(|p| p.exists())
}

/// `<config_dir>/parkcast/parkcast.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("parkcast").join("parkcast.toml"))
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Optional URL where `""` means disabled; `None` is written back as `""`
mod empty_disables {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(value.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        Ok(raw
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty()))
    }
}
