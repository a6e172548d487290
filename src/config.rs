use crate::cities::DEFAULT_CITY_ID;
use crate::fetch::DEFAULT_ENDPOINT;
use crate::render::DEFAULT_ZOOM;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Overrides `map.style_key` when set.
pub const STYLE_KEY_ENV: &str = "TRAFFIC_MAP_STYLE_KEY";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub overpass: OverpassConfig,
    pub map: MapConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OverpassConfig {
    pub endpoint: String,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    pub default_city: String,
    pub default_style: String,
    pub style_key: String, // MapTiler API key
    pub zoom: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            default_city: DEFAULT_CITY_ID.to_string(),
            default_style: "dark".to_string(),
            style_key: String::new(),
            zoom: DEFAULT_ZOOM,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            static_dir: PathBuf::from("static"),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }

    /// Loads `path` when given, otherwise defaults, then applies the
    /// environment override for the style key.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        Ok(config.with_style_key(std::env::var(STYLE_KEY_ENV).ok()))
    }

    pub fn with_style_key(mut self, key: Option<String>) -> Self {
        if let Some(key) = key.filter(|k| !k.is_empty()) {
            self.map.style_key = key;
        }
        self
    }
}
