//! Configuration management
//!
//! This module handles loading, validation, and management of the Waypoint
//! configuration. Configuration is stored in TOML format at
//! ~/.waypoint/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level
//! - **server**: Listen address and per-client queue size
//! - **llm**: OpenAI-compatible completion endpoint settings
//! - **geocoding**: Geocoding endpoint and match policy
//! - **map**: Initial position and zoom bounds
//! - **orchestrator**: Round limit and system prompt override
//!
//! # Examples
//!
//! ```no_run
//! use waypoint_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Model: {}", config.llm.model);
//! println!("Max rounds: {}", config.orchestrator.max_rounds);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use sdk::types::{coordinates_in_range, MapState};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
///
/// Every section has defaults, so a partial file (or an empty one) is valid.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub core: CoreConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub llm: LLMConfig,

    #[serde(default)]
    pub geocoding: GeocodingConfig,

    #[serde(default)]
    pub map: MapConfig,

    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

/// Core settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// HTTP / WebSocket server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Outbound messages buffered per client before it is considered dead
    #[serde(default = "default_client_queue_capacity")]
    pub client_queue_capacity: usize,
}

/// OpenAI-compatible completion provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Base URL, without the trailing `/chat/completions`
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Environment variable holding the API key.
    /// Local endpoints usually need none; a missing variable sends no key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Timeout for a single completion request
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Extra attempts after a retryable failure
    #[serde(default = "default_llm_retries")]
    pub max_retries: u32,
}

/// Geocoding provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// GeocodeServer base URL; `/findAddressCandidates` is appended
    #[serde(default = "default_geocoding_base_url")]
    pub base_url: String,

    #[serde(default = "default_max_locations")]
    pub max_locations: u32,

    /// Minimum confidence (0.0-1.0) for picking the best of several matches
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Zoom applied after a successful geocode, clamped into the map bounds
    #[serde(default = "default_focus_zoom")]
    pub focus_zoom: Option<u8>,

    #[serde(default = "default_geocoding_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_geocoding_retries")]
    pub max_retries: u32,
}

/// Map defaults and bounds
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MapConfig {
    #[serde(default)]
    pub default_latitude: f64,

    #[serde(default)]
    pub default_longitude: f64,

    #[serde(default = "default_zoom")]
    pub default_zoom: u8,

    #[serde(default)]
    pub min_zoom: u8,

    #[serde(default = "default_max_zoom")]
    pub max_zoom: u8,
}

/// Conversation orchestrator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum model rounds per user turn
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,

    /// Replaces the built-in system prompt when set
    #[serde(default)]
    pub system_prompt: Option<String>,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_client_queue_capacity() -> usize {
    256
}

fn default_llm_base_url() -> String {
    "http://localhost:11434/v1".to_string()
}

fn default_llm_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_llm_timeout() -> u64 {
    60
}

fn default_llm_retries() -> u32 {
    2
}

fn default_geocoding_base_url() -> String {
    "https://geocode.arcgis.com/arcgis/rest/services/World/GeocodeServer".to_string()
}

fn default_max_locations() -> u32 {
    10
}

fn default_confidence_threshold() -> f64 {
    0.9
}

fn default_focus_zoom() -> Option<u8> {
    Some(15)
}

fn default_geocoding_timeout() -> u64 {
    10
}

fn default_geocoding_retries() -> u32 {
    1
}

fn default_zoom() -> u8 {
    2
}

fn default_max_zoom() -> u8 {
    20
}

fn default_max_rounds() -> usize {
    6
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            client_queue_capacity: default_client_queue_capacity(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout(),
            max_retries: default_llm_retries(),
        }
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: default_geocoding_base_url(),
            max_locations: default_max_locations(),
            confidence_threshold: default_confidence_threshold(),
            focus_zoom: default_focus_zoom(),
            timeout_secs: default_geocoding_timeout(),
            max_retries: default_geocoding_retries(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            default_latitude: 0.0,
            default_longitude: 0.0,
            default_zoom: default_zoom(),
            min_zoom: 0,
            max_zoom: default_max_zoom(),
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            system_prompt: None,
        }
    }
}

impl LLMConfig {
    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

impl GeocodingConfig {
    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl MapConfig {
    /// State the store starts from
    pub fn initial_state(&self) -> MapState {
        MapState::initial(
            self.default_latitude,
            self.default_longitude,
            self.default_zoom,
        )
    }

    /// Clamp a requested zoom into `[min_zoom, max_zoom]`
    pub fn clamp_zoom(&self, level: i64) -> u8 {
        // Bounds are u8, so the clamped value always fits
        level.clamp(i64::from(self.min_zoom), i64::from(self.max_zoom)) as u8
    }
}

impl Config {
    /// Load configuration from the default location (~/.waypoint/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or written, TOML parsing
    /// fails, or validation fails.
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self, EngineError> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let config = Config::default();
        config.validate()?;

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.waypoint/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".waypoint").join("config.toml"))
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        let map = &self.map;
        if map.min_zoom > map.max_zoom {
            return Err(EngineError::Config(format!(
                "min_zoom ({}) must not exceed max_zoom ({})",
                map.min_zoom, map.max_zoom
            )));
        }
        if map.default_zoom < map.min_zoom || map.default_zoom > map.max_zoom {
            return Err(EngineError::Config(format!(
                "default_zoom ({}) must be between min_zoom ({}) and max_zoom ({})",
                map.default_zoom, map.min_zoom, map.max_zoom
            )));
        }
        if !coordinates_in_range(map.default_latitude, map.default_longitude) {
            return Err(EngineError::Config(
                "default_latitude must be in [-90, 90] and default_longitude in [-180, 180]"
                    .to_string(),
            ));
        }

        let threshold = self.geocoding.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(EngineError::Config(
                "confidence_threshold must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.orchestrator.max_rounds == 0 {
            return Err(EngineError::Config(
                "max_rounds must be at least 1".to_string(),
            ));
        }

        if self.llm.timeout_secs == 0 || self.geocoding.timeout_secs == 0 {
            return Err(EngineError::Config(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.server.client_queue_capacity == 0 {
            return Err(EngineError::Config(
                "client_queue_capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
