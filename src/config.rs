//! Application-level configuration loading, including the default product catalog.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "ZONA_XTREME_CONFIG_PATH";
/// Capacity of the SSE broadcast channel when the file does not set one.
const DEFAULT_SSE_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Product inserted into an empty catalog on first connection.
pub struct CatalogSeed {
    pub name: String,
    pub price_cents: i64,
    pub time_seconds: Option<i64>,
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    catalog: Vec<CatalogSeed>,
    sse_capacity: usize,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the baked-in catalog.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        products = app_config.catalog.len(),
                        "loaded catalog seed from config"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a configuration document. Seeds with a non-positive play time are dropped.
    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    /// Products written into an empty catalog.
    pub fn catalog(&self) -> &[CatalogSeed] {
        &self.catalog
    }

    /// Capacity of the real-time event channel.
    pub fn sse_capacity(&self) -> usize {
        self.sse_capacity
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog: default_catalog(),
            sse_capacity: DEFAULT_SSE_CAPACITY,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    catalog: Option<Vec<RawProduct>>,
    #[serde(default)]
    sse_capacity: Option<usize>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let catalog = match value.catalog {
            Some(products) => products
                .into_iter()
                .filter_map(|raw| {
                    let seed = CatalogSeed::from(raw);
                    match seed.time_seconds {
                        Some(seconds) if seconds <= 0 => {
                            warn!(name = %seed.name, "ignoring catalog seed with non-positive play time");
                            None
                        }
                        _ => Some(seed),
                    }
                })
                .collect(),
            None => default_catalog(),
        };

        Self {
            catalog,
            sse_capacity: value
                .sse_capacity
                .filter(|capacity| *capacity > 0)
                .unwrap_or(DEFAULT_SSE_CAPACITY),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of a single catalog entry inside the configuration file.
struct RawProduct {
    name: String,
    price_cents: i64,
    #[serde(default)]
    minutes: Option<i64>,
}

impl From<RawProduct> for CatalogSeed {
    fn from(value: RawProduct) -> Self {
        Self {
            name: value.name,
            price_cents: value.price_cents,
            time_seconds: value.minutes.map(|minutes| minutes.saturating_mul(60)),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in catalog shipped with the binary.
fn default_catalog() -> Vec<CatalogSeed> {
    vec![
        CatalogSeed {
            name: "Pulsera 30 min".into(),
            price_cents: 5_000,
            time_seconds: Some(30 * 60),
        },
        CatalogSeed {
            name: "Pulsera 60 min".into(),
            price_cents: 8_000,
            time_seconds: Some(60 * 60),
        },
        CatalogSeed {
            name: "Pulsera 120 min".into(),
            price_cents: 14_000,
            time_seconds: Some(120 * 60),
        },
        CatalogSeed {
            name: "Calcetines antiderrapantes".into(),
            price_cents: 3_500,
            time_seconds: None,
        },
        CatalogSeed {
            name: "Agua 600 ml".into(),
            price_cents: 1_500,
            time_seconds: None,
        },
    ]
}
