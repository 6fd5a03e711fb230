//! Settings with defaults and RON persistence.

mod cli;
mod error;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

pub use cli::{parse_lat_lon, CliArgs};
pub use error::ConfigError;

use crate::data::DataPaths;
use crate::globe::{DeviceClass, GlobeOptions, InputMode, Rotation};

/// Terminals narrower than this count as mobile when the device is `auto`.
pub const MOBILE_MAX_COLUMNS: u16 = 80;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub view: ViewConfig,
    pub theme: ThemeConfig,
    pub log: LogConfig,
}

/// Where the atlas files live.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataConfig {
    pub data_dir: PathBuf,
    /// TopoJSON or GeoJSON world file
    pub atlas: String,
    /// Tab-separated code/name table
    pub country_names: String,
    /// JSON array of [population, name, lat, lon]
    pub cities: String,
    /// Use the coarse built-in world instead of reading files.
    pub builtin: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            atlas: "world.json".to_string(),
            country_names: "countries.tsv".to_string(),
            cities: "cities.json".to_string(),
            builtin: false,
        }
    }
}

impl DataConfig {
    pub fn paths(&self) -> DataPaths {
        DataPaths {
            atlas: self.data_dir.join(&self.atlas),
            country_names: self.data_dir.join(&self.country_names),
            cities: self.data_dir.join(&self.cities),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DeviceHint {
    #[default]
    Auto,
    Mobile,
    Desktop,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewConfig {
    pub device: DeviceHint,
    pub input: InputMode,
    pub day_night: bool,
    /// Path sampling tolerance in braille dots.
    pub precision: f64,
    pub initial_yaw: f64,
    pub initial_pitch: f64,
    pub fly_duration_ms: u64,
    pub resize_debounce_ms: u64,
    pub sun_refresh_secs: u64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            device: DeviceHint::Auto,
            input: InputMode::Pointer,
            day_night: true,
            precision: 0.5,
            initial_yaw: 40.0,
            initial_pitch: -20.0,
            fly_duration_ms: 1000,
            resize_debounce_ms: 250,
            sun_refresh_secs: 60,
        }
    }
}

impl ViewConfig {
    /// Resolve `auto` against the terminal width.
    pub fn device_class(&self, columns: u16) -> DeviceClass {
        match self.device {
            DeviceHint::Mobile => DeviceClass::Mobile,
            DeviceHint::Desktop => DeviceClass::Desktop,
            DeviceHint::Auto if columns < MOBILE_MAX_COLUMNS => DeviceClass::Mobile,
            DeviceHint::Auto => DeviceClass::Desktop,
        }
    }

    pub fn globe_options(&self, columns: u16) -> GlobeOptions {
        GlobeOptions {
            device: self.device_class(columns),
            input: self.input,
            day_night: self.day_night,
            precision: self.precision,
            initial_rotation: Rotation::new(self.initial_yaw, self.initial_pitch, 0.0),
            fly_duration: Duration::from_millis(self.fly_duration_ms),
            resize_debounce: Duration::from_millis(self.resize_debounce_ms),
            sun_refresh: Duration::from_secs(self.sun_refresh_secs.max(1)),
        }
    }
}

/// Layer colours as `#rrggbb` hex strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThemeConfig {
    pub water: String,
    pub land: String,
    pub graticule: String,
    pub coastline: String,
    pub borders: String,
    pub night: String,
    pub terminator: String,
    pub city_lights: String,
    pub markers: String,
    pub marker_polygon: String,
    pub marker_links: String,
    pub highlight: String,
    pub selection: String,
    pub labels: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            water: "#359faf".to_string(),
            land: "#006400".to_string(),
            graticule: "#ffff00".to_string(),
            coastline: "#00ffff".to_string(),
            borders: "#000000".to_string(),
            night: "#74ccf4".to_string(),
            terminator: "#74ccf4".to_string(),
            city_lights: "#ffff00".to_string(),
            markers: "#ff0000".to_string(),
            marker_polygon: "#ff8800".to_string(),
            marker_links: "#ff8800".to_string(),
            highlight: "#555555".to_string(),
            selection: "#cccccc".to_string(),
            labels: "#ffffff".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive, e.g. "info" or "tui_globe=debug".
    pub level: String,
    /// Log file; defaults to the user cache directory.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl LogConfig {
    pub fn file_path(&self) -> Option<PathBuf> {
        self.file
            .clone()
            .or_else(|| dirs::cache_dir().map(|d| d.join("tui-globe").join("tui-globe.log")))
    }
}

const CONFIG_FILE: &str = "config.ron";

/// Default config directory: `<config_dir>/tui-globe`, or the working
/// directory when the platform has none.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("tui-globe"))
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Config {
    /// Read `config.ron` from `config_dir`, writing the defaults there first
    /// when it does not exist yet.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(CONFIG_FILE);
        if !path.exists() {
            let config = Config::default();
            config.save(config_dir)?;
            info!("wrote default config to {}", path.display());
            return Ok(config);
        }

        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config = ron::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        let path = config_dir.join(CONFIG_FILE);
        let write_err = |source| ConfigError::Write {
            path: path.clone(),
            source,
        };
        std::fs::create_dir_all(config_dir).map_err(write_err)?;
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::new().depth_limit(3))
            .map_err(ConfigError::Serialize)?;
        std::fs::write(&path, text).map_err(write_err)
    }
}
