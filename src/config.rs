use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::capacity::bucket::DedupPolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub credentials: Credentials,
    pub data: DataConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub style: StyleConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Credentials {
    pub nrel_api_key: String,
    pub mapbox_access_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    pub wind_west: PathBuf,
    pub wind_east: PathBuf,
    pub power_plants: PathBuf,
    /// Solar capacities written by `recap solar` and read back for plotting
    pub solar_csv: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Which record a geohash bucket keeps when thinning markers
    pub dedup: DedupPolicy,
    /// Geohash length used to match west and east wind sites
    pub scaling_precision: usize,
    /// Geohash length used to thin out markers before plotting
    pub display_precision: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            dedup: DedupPolicy::First,
            scaling_precision: 5,
            display_precision: 4,
        }
    }
}

/// Marker colors, each `rgb(r,g,b)` or a Plotly color scale name
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StyleConfig {
    pub plant_color: String,
    pub solar_color: String,
    pub wind_color: String,
    pub solar_gradient: String,
    pub wind_gradient: String,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            plant_color: "rgb(0,116,217)".to_string(),
            solar_color: "rgb(250,194,5)".to_string(),
            wind_color: "rgb(45,249,5)".to_string(),
            solar_gradient: "Reds".to_string(),
            wind_gradient: "Greens".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub figure_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            figure_dir: PathBuf::from("figures"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3044 }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let mut config = Self::parse(&content)?;

        if let Ok(key) = std::env::var("NREL_API_KEY") {
            config.credentials.nrel_api_key = key;
        }
        if let Ok(token) = std::env::var("MAPBOX_ACCESS_TOKEN") {
            config.credentials.mapbox_access_token = token;
        }
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse TOML configuration")
    }
}
