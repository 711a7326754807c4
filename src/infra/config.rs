//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml

use crate::domain::types::Coordinate;
use crate::presentation::BasemapStyle;
use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Environment variable consulted when no access token is configured
pub const ACCESS_TOKEN_ENV: &str = "MAPBOX_ACCESS_TOKEN";

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationSourceKind {
    Gpsd,
    Replay,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SiteConfig {
    /// Identifier used as the metrics label
    #[serde(default = "default_site_id")]
    pub id: String,
}

fn default_site_id() -> String {
    "campus".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectionsConfig {
    #[serde(default = "default_directions_base_url")]
    pub base_url: String,
    #[serde(default = "default_directions_profile")]
    pub profile: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_directions_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for DirectionsConfig {
    fn default() -> Self {
        Self {
            base_url: default_directions_base_url(),
            profile: default_directions_profile(),
            access_token: None,
            timeout_ms: default_directions_timeout_ms(),
        }
    }
}

fn default_directions_base_url() -> String {
    "https://api.mapbox.com".to_string()
}

fn default_directions_profile() -> String {
    "walking".to_string()
}

fn default_directions_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryConfig {
    /// Quick navigation shortlist (URL, file:// URL or plain path)
    #[serde(default = "default_quick_navigation")]
    pub quick_navigation: String,
    /// Full building list (URL, file:// URL or plain path)
    #[serde(default = "default_buildings")]
    pub buildings: String,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self { quick_navigation: default_quick_navigation(), buildings: default_buildings() }
    }
}

fn default_quick_navigation() -> String {
    "http://localhost:5173/data/quick-navigation.json".to_string()
}

fn default_buildings() -> String {
    "http://localhost:5173/data/buildings.json".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationConfig {
    #[serde(default = "default_location_source")]
    pub source: LocationSourceKind,
    #[serde(default = "default_gpsd_addr")]
    pub gpsd_addr: String,
    #[serde(default)]
    pub replay_file: Option<String>,
    #[serde(default = "default_replay_interval_ms")]
    pub replay_interval_ms: u64,
    #[serde(default = "default_high_accuracy")]
    pub high_accuracy: bool,
    #[serde(default = "default_location_timeout_ms")]
    pub timeout_ms: u64,
    /// Reject fixes older than this (0 disables the check)
    #[serde(default = "default_max_sample_age_ms")]
    pub max_sample_age_ms: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            source: default_location_source(),
            gpsd_addr: default_gpsd_addr(),
            replay_file: None,
            replay_interval_ms: default_replay_interval_ms(),
            high_accuracy: default_high_accuracy(),
            timeout_ms: default_location_timeout_ms(),
            max_sample_age_ms: default_max_sample_age_ms(),
        }
    }
}

fn default_location_source() -> LocationSourceKind {
    LocationSourceKind::Gpsd
}

fn default_gpsd_addr() -> String {
    "127.0.0.1:2947".to_string()
}

fn default_replay_interval_ms() -> u64 {
    1000
}

fn default_high_accuracy() -> bool {
    true
}

fn default_location_timeout_ms() -> u64 {
    5000
}

fn default_max_sample_age_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct NavigationConfig {
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self { search_debounce_ms: default_search_debounce_ms() }
    }
}

fn default_search_debounce_ms() -> u64 {
    500
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapConfig {
    #[serde(default = "default_map_style")]
    pub default_style: BasemapStyle,
    #[serde(default = "default_map_zoom")]
    pub default_zoom: f64,
    /// [latitude, longitude] shown before the first fix
    #[serde(default = "default_map_center")]
    pub default_center: [f64; 2],
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            default_style: default_map_style(),
            default_zoom: default_map_zoom(),
            default_center: default_map_center(),
        }
    }
}

fn default_map_style() -> BasemapStyle {
    BasemapStyle::Streets
}

fn default_map_zoom() -> f64 {
    17.0
}

fn default_map_center() -> [f64; 2] {
    [37.7749, -122.4194]
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// HTTP API port (0 to disable)
    #[serde(default = "default_http_port")]
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { port: default_http_port() }
    }
}

fn default_http_port() -> u16 {
    8080
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval() }
    }
}

fn default_metrics_interval() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AnnounceConfig {
    /// Text-to-speech command; the instruction is appended as the last argument
    #[serde(default)]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub directions: DirectionsConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub navigation: NavigationConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub announce: AnnounceConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    site_id: String,
    directions_base_url: String,
    directions_profile: String,
    directions_access_token: Option<String>,
    directions_timeout_ms: u64,
    quick_navigation_source: String,
    buildings_source: String,
    location_source: LocationSourceKind,
    gpsd_addr: String,
    replay_file: Option<String>,
    replay_interval_ms: u64,
    high_accuracy: bool,
    location_timeout_ms: u64,
    max_sample_age_ms: u64,
    search_debounce_ms: u64,
    default_style: BasemapStyle,
    default_zoom: f64,
    default_center: Coordinate,
    http_port: u16,
    metrics_interval_secs: u64,
    announce_command: Vec<String>,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default".to_string())
    }
}

impl Config {
    /// Determine config file path from args or environment
    pub fn resolve_config_path(args: &[String]) -> String {
        for (i, arg) in args.iter().enumerate() {
            if arg == "--config" {
                if let Some(path) = args.get(i + 1) {
                    return path.clone();
                }
            }
            if let Some(path) = arg.strip_prefix("--config=") {
                return path.to_string();
            }
        }

        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        "config/dev.toml".to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self::from_toml(toml_config, path.display().to_string()))
    }

    /// Load configuration - tries TOML file first, falls back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "config_load_failed_using_defaults");
                Self::default()
            }
        }
    }

    fn from_toml(t: TomlConfig, config_file: String) -> Self {
        let access_token = t
            .directions
            .access_token
            .filter(|s| !s.is_empty())
            .or_else(|| env::var(ACCESS_TOKEN_ENV).ok().filter(|s| !s.is_empty()));

        Self {
            site_id: t.site.id,
            directions_base_url: t.directions.base_url.trim_end_matches('/').to_string(),
            directions_profile: t.directions.profile,
            directions_access_token: access_token,
            directions_timeout_ms: t.directions.timeout_ms,
            quick_navigation_source: t.directory.quick_navigation,
            buildings_source: t.directory.buildings,
            location_source: t.location.source,
            gpsd_addr: t.location.gpsd_addr,
            replay_file: t.location.replay_file,
            replay_interval_ms: t.location.replay_interval_ms,
            high_accuracy: t.location.high_accuracy,
            location_timeout_ms: t.location.timeout_ms,
            max_sample_age_ms: t.location.max_sample_age_ms,
            search_debounce_ms: t.navigation.search_debounce_ms,
            default_style: t.map.default_style,
            default_zoom: t.map.default_zoom,
            default_center: Coordinate::new(t.map.default_center[0], t.map.default_center[1]),
            http_port: t.http.port,
            metrics_interval_secs: t.metrics.interval_secs,
            announce_command: t.announce.command,
            config_file,
        }
    }

    // Getters for all config fields
    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn directions_base_url(&self) -> &str {
        &self.directions_base_url
    }

    pub fn directions_profile(&self) -> &str {
        &self.directions_profile
    }

    pub fn directions_access_token(&self) -> Option<&str> {
        self.directions_access_token.as_deref()
    }

    pub fn directions_timeout(&self) -> Duration {
        Duration::from_millis(self.directions_timeout_ms)
    }

    pub fn quick_navigation_source(&self) -> &str {
        &self.quick_navigation_source
    }

    pub fn buildings_source(&self) -> &str {
        &self.buildings_source
    }

    pub fn location_source(&self) -> LocationSourceKind {
        self.location_source
    }

    pub fn gpsd_addr(&self) -> &str {
        &self.gpsd_addr
    }

    pub fn replay_file(&self) -> Option<&str> {
        self.replay_file.as_deref()
    }

    pub fn replay_interval(&self) -> Duration {
        Duration::from_millis(self.replay_interval_ms)
    }

    pub fn high_accuracy(&self) -> bool {
        self.high_accuracy
    }

    pub fn location_timeout_ms(&self) -> u64 {
        self.location_timeout_ms
    }

    pub fn max_sample_age_ms(&self) -> u64 {
        self.max_sample_age_ms
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn default_style(&self) -> BasemapStyle {
        self.default_style
    }

    pub fn default_zoom(&self) -> f64 {
        self.default_zoom
    }

    pub fn default_center(&self) -> Coordinate {
        self.default_center
    }

    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn announce_command(&self) -> &[String] {
        &self.announce_command
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Override the location source with a replay file (CLI `--replay`)
    pub fn with_replay_file(mut self, path: impl Into<String>) -> Self {
        self.location_source = LocationSourceKind::Replay;
        self.replay_file = Some(path.into());
        self
    }
}
