//! Dashboard configuration.
//!
//! Loaded from `dashboard_config.json`, with `KOMMUN_DASHBOARD_CONFIG` pointing
//! at an override file.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;

use crate::buckets::{Palette, SortDirection};
use crate::color::Rgb;

pub const BUILTIN_DASHBOARD_CONFIG: &str = include_str!("data/dashboard_config.json");

pub const DASHBOARD_CONFIG_ENV: &str = "KOMMUN_DASHBOARD_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub api: ApiConfig,
    pub geo: GeoConfig,
    pub palette: Palette,
    pub style: StyleConfig,
    pub session: SessionConfig,
}

impl DashboardConfig {
    pub fn builtin() -> Arc<Self> {
        Arc::new(
            serde_json::from_str(BUILTIN_DASHBOARD_CONFIG)
                .expect("builtin dashboard config should parse"),
        )
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: &Path) -> Result<Self, DashboardConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| DashboardConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = DashboardConfig::from_json_str(&contents)?;
        Ok(config)
    }
}

#[derive(Debug, Error)]
pub enum DashboardConfigError {
    #[error("failed to parse dashboard config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read dashboard config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Where the KPI data API lives.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_ms: u64,
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeoConfig {
    pub geojson_path: PathBuf,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            geojson_path: PathBuf::from("static/data/sweden_municipalities.geojson"),
        }
    }
}

/// Region layer styling. Opacities are in `0.0..=1.0`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub fill_opacity: f32,
    pub no_data_fill_opacity: f32,
    pub border_weight: f32,
    pub border_color: Rgb,
    pub border_opacity: f32,
    pub highlight_weight: f32,
    pub highlight_border_color: Rgb,
    pub highlight_fill_opacity: f32,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            fill_opacity: 0.7,
            no_data_fill_opacity: 0.1,
            border_weight: 1.0,
            border_color: Rgb::new(0x66, 0x66, 0x66),
            border_opacity: 1.0,
            highlight_weight: 2.0,
            highlight_border_color: Rgb::new(0x33, 0x33, 0x33),
            highlight_fill_opacity: 0.9,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub high_is_good: bool,
    /// Years before the current calendar year that is preselected when an
    /// indicator's year list contains it.
    pub default_year_offset: i32,
}

impl SessionConfig {
    pub fn direction(&self) -> SortDirection {
        SortDirection::from_high_is_good(self.high_is_good)
    }

    pub fn default_year(&self, current_year: i32) -> String {
        (current_year - self.default_year_offset).to_string()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            high_is_good: true,
            default_year_offset: 1,
        }
    }
}

/// Metadata about the dashboard configuration source.
#[derive(Debug, Clone)]
pub struct DashboardConfigMetadata {
    path: Option<PathBuf>,
}

impl DashboardConfigMetadata {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }
}

/// Load the dashboard configuration from an explicit path, the environment,
/// or the builtin copy, in that order of preference.
pub fn load_dashboard_config(
    explicit: Option<&Path>,
) -> (Arc<DashboardConfig>, DashboardConfigMetadata) {
    let override_path = explicit
        .map(Path::to_path_buf)
        .or_else(|| env::var(DASHBOARD_CONFIG_ENV).ok().map(PathBuf::from));

    if let Some(path) = override_path {
        match DashboardConfig::from_file(&path) {
            Ok(config) => {
                tracing::info!(
                    target: "kommun::config",
                    path = %path.display(),
                    "dashboard_config.loaded=file"
                );
                return (Arc::new(config), DashboardConfigMetadata::new(Some(path)));
            }
            Err(err) => {
                tracing::warn!(
                    target: "kommun::config",
                    path = %path.display(),
                    error = %err,
                    "dashboard_config.load_failed"
                );
            }
        }
    }

    let config = DashboardConfig::builtin();
    tracing::info!(
        target: "kommun::config",
        "dashboard_config.loaded=builtin"
    );
    (config, DashboardConfigMetadata::new(None))
}

/// Same as [`load_dashboard_config`] with no explicit path.
pub fn load_dashboard_config_from_env() -> (Arc<DashboardConfig>, DashboardConfigMetadata) {
    load_dashboard_config(None)
}
