//! Configuration management
//!
//! This module handles loading and parsing configuration for the Ayunetra server.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults. The hosted
//! store endpoint, its public key and the maps key are required and checked
//! by [`Config::validate`] before the server starts.

use serde::{Deserialize, Serialize};

use crate::models::Coordinate;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Auth + message store configuration
    #[serde(default)]
    pub store: StoreConfig,
    /// Local SQLite database (used by the `local` store backend)
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Places / map configuration
    #[serde(default)]
    pub maps: MapsConfig,
    /// Session cookie configuration
    #[serde(default)]
    pub session: SessionConfig,
    /// Chat configuration
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public origin of the site, used to build confirmation redirect links
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: default_public_url(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_public_url() -> String {
    "http://localhost:8080".to_string()
}

/// Which implementation backs the session and message stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Hosted auth + table service reached over HTTP (default)
    #[default]
    Hosted,
    /// Local SQLite database
    Local,
}

/// Auth and message store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Hosted service endpoint, e.g. `https://<project>.supabase.co`
    #[serde(default)]
    pub url: Option<String>,
    /// Hosted service public (anon) API key
    #[serde(default)]
    pub anon_key: Option<String>,
    /// Table holding chat message/response pairs
    #[serde(default = "default_messages_table")]
    pub messages_table: String,
    /// Optional request timeout for hosted calls; unset means no timeout
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            url: None,
            anon_key: None,
            messages_table: default_messages_table(),
            timeout_seconds: None,
        }
    }
}

fn default_messages_table() -> String {
    "messages".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path or URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/ayunetra.db".to_string()
}

/// Places lookup and map configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapsConfig {
    /// Maps API key (also handed to the browser map surface)
    #[serde(default)]
    pub api_key: Option<String>,
    /// Nearby search endpoint
    #[serde(default = "default_places_url")]
    pub places_url: String,
    /// Search radius in meters
    #[serde(default = "default_radius_meters")]
    pub radius_meters: u32,
    /// Place category to search for
    #[serde(default = "default_category")]
    pub category: String,
    /// Latitude used when the device location is unavailable
    #[serde(default = "default_fallback_lat")]
    pub fallback_lat: f64,
    /// Longitude used when the device location is unavailable
    #[serde(default = "default_fallback_lng")]
    pub fallback_lng: f64,
    /// How long successful lookups stay cached
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
}

impl Default for MapsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            places_url: default_places_url(),
            radius_meters: default_radius_meters(),
            category: default_category(),
            fallback_lat: default_fallback_lat(),
            fallback_lng: default_fallback_lng(),
            cache_ttl_seconds: default_cache_ttl(),
        }
    }
}

impl MapsConfig {
    /// Fallback map centre
    pub fn fallback(&self) -> Coordinate {
        Coordinate::new(self.fallback_lat, self.fallback_lng)
    }
}

fn default_places_url() -> String {
    "https://maps.googleapis.com/maps/api/place/nearbysearch/json".to_string()
}

fn default_radius_meters() -> u32 {
    5000
}

fn default_category() -> String {
    "hospital".to_string()
}

// Centre of India
fn default_fallback_lat() -> f64 {
    20.5937
}

fn default_fallback_lng() -> f64 {
    78.9629
}

fn default_cache_ttl() -> u64 {
    300
}

/// Session cookie configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Cookie lifetime in seconds (default: 7 days)
    #[serde(default = "default_lifetime")]
    pub lifetime_seconds: i64,
    /// Mark the cookie `Secure`
    #[serde(default)]
    pub secure_cookie: bool,
    /// Refresh the session on every guarded request
    #[serde(default = "default_true")]
    pub refresh_on_request: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            lifetime_seconds: default_lifetime(),
            secure_cookie: false,
            refresh_on_request: true,
        }
    }
}

fn default_cookie_name() -> String {
    "sb-auth".to_string()
}

fn default_lifetime() -> i64 {
    7 * 24 * 60 * 60
}

fn default_true() -> bool {
    true
}

/// Chat configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Reply stored alongside each message until a model backend is wired in
    #[serde(default = "default_placeholder_response")]
    pub placeholder_response: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            placeholder_response: default_placeholder_response(),
        }
    }
}

fn default_placeholder_response() -> String {
    "Thank you for your question. Personalized Ayurvedic guidance will appear here soon.".to_string()
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
    #[error("Missing required configuration '{key}' (set {env})")]
    Missing {
        key: &'static str,
        env: &'static str,
    },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - AYUNETRA_SERVER_HOST / AYUNETRA_SERVER_PORT / AYUNETRA_SERVER_PUBLIC_URL
    /// - AYUNETRA_STORE_BACKEND / AYUNETRA_STORE_URL / AYUNETRA_STORE_ANON_KEY
    /// - AYUNETRA_STORE_MESSAGES_TABLE
    /// - AYUNETRA_DATABASE_URL
    /// - AYUNETRA_MAPS_API_KEY / AYUNETRA_MAPS_PLACES_URL
    /// - AYUNETRA_SESSION_COOKIE_NAME / AYUNETRA_SESSION_SECURE_COOKIE
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        // Server configuration
        if let Ok(host) = std::env::var("AYUNETRA_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("AYUNETRA_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(public_url) = std::env::var("AYUNETRA_SERVER_PUBLIC_URL") {
            self.server.public_url = public_url;
        }

        // Store configuration
        if let Ok(backend) = std::env::var("AYUNETRA_STORE_BACKEND") {
            match backend.to_lowercase().as_str() {
                "hosted" => self.store.backend = StoreBackend::Hosted,
                "local" => self.store.backend = StoreBackend::Local,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("AYUNETRA_STORE_URL") {
            self.store.url = Some(url);
        }
        if let Ok(key) = std::env::var("AYUNETRA_STORE_ANON_KEY") {
            self.store.anon_key = Some(key);
        }
        if let Ok(table) = std::env::var("AYUNETRA_STORE_MESSAGES_TABLE") {
            self.store.messages_table = table;
        }

        // Database configuration
        if let Ok(url) = std::env::var("AYUNETRA_DATABASE_URL") {
            self.database.url = url;
        }

        // Maps configuration
        if let Ok(key) = std::env::var("AYUNETRA_MAPS_API_KEY") {
            self.maps.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("AYUNETRA_MAPS_PLACES_URL") {
            self.maps.places_url = url;
        }

        // Session configuration
        if let Ok(name) = std::env::var("AYUNETRA_SESSION_COOKIE_NAME") {
            self.session.cookie_name = name;
        }
        if let Ok(secure) = std::env::var("AYUNETRA_SESSION_SECURE_COOKIE") {
            if let Ok(secure) = secure.parse::<bool>() {
                self.session.secure_cookie = secure;
            }
        }
    }

    /// Check that every required value is present.
    ///
    /// The hosted backend needs the store endpoint and its public key; the
    /// maps key is required whatever the backend.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.backend == StoreBackend::Hosted {
            if is_blank(&self.store.url) {
                return Err(ConfigError::Missing {
                    key: "store.url",
                    env: "AYUNETRA_STORE_URL",
                });
            }
            if is_blank(&self.store.anon_key) {
                return Err(ConfigError::Missing {
                    key: "store.anon_key",
                    env: "AYUNETRA_STORE_ANON_KEY",
                });
            }
        }

        if is_blank(&self.maps.api_key) {
            return Err(ConfigError::Missing {
                key: "maps.api_key",
                env: "AYUNETRA_MAPS_API_KEY",
            });
        }

        if self.session.lifetime_seconds <= 0 {
            return Err(ConfigError::ValidationError(
                "session.lifetime_seconds must be positive".to_string(),
            ));
        }

        if !self.maps.fallback().is_valid() {
            return Err(ConfigError::ValidationError(format!(
                "maps fallback ({}, {}) is not a valid coordinate",
                self.maps.fallback_lat, self.maps.fallback_lng
            )));
        }

        Ok(())
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared mutex for all config tests that modify environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
const ENV_KEYS: &[&str] = &[
    "AYUNETRA_SERVER_HOST",
    "AYUNETRA_SERVER_PORT",
    "AYUNETRA_SERVER_PUBLIC_URL",
    "AYUNETRA_STORE_BACKEND",
    "AYUNETRA_STORE_URL",
    "AYUNETRA_STORE_ANON_KEY",
    "AYUNETRA_STORE_MESSAGES_TABLE",
    "AYUNETRA_DATABASE_URL",
    "AYUNETRA_MAPS_API_KEY",
    "AYUNETRA_MAPS_PLACES_URL",
    "AYUNETRA_SESSION_COOKIE_NAME",
    "AYUNETRA_SESSION_SECURE_COOKIE",
];

#[cfg(test)]
fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}


/// Property-based tests for configuration parsing
#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        super::CONFIG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        #[test]
        fn prop_yaml_roundtrip_preserves_fields(
            port in 1u16..=65535,
            radius in 100u32..=50_000,
            table in "[a-z_]{3,16}",
            local in any::<bool>(),
        ) {
            let mut config = Config::default();
            config.server.port = port;
            config.maps.radius_meters = radius;
            config.store.messages_table = table.clone();
            config.store.backend = if local { StoreBackend::Local } else { StoreBackend::Hosted };

            let yaml = serde_yaml::to_string(&config).unwrap();
            let parsed: Config = serde_yaml::from_str(&yaml).unwrap();

            prop_assert_eq!(parsed.server.port, port);
            prop_assert_eq!(parsed.maps.radius_meters, radius);
            prop_assert_eq!(parsed.store.messages_table, table);
            prop_assert_eq!(parsed.store.backend, config.store.backend);
        }

        #[test]
        fn prop_env_port_overrides_file(file_port in 1u16..=65535, env_port in 1u16..=65535) {
            let _guard = lock_env();
            super::clear_env();

            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("config.yml");
            std::fs::write(&path, format!("server:\n  port: {}\n", file_port)).unwrap();

            std::env::set_var("AYUNETRA_SERVER_PORT", env_port.to_string());
            let config = Config::load_with_env(&path).unwrap();
            super::clear_env();

            prop_assert_eq!(config.server.port, env_port);
        }
    }
}
