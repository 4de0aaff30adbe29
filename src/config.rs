//! # Configuration Management Module
//!
//! ## Purpose
//! Centralized configuration for the listing search core, loaded from TOML
//! files with environment variable overrides, validation, and defaults.
//!
//! ## Configuration Sources (in order of precedence)
//! 1. Environment variables (`LISTING_SEARCH_*`)
//! 2. Configuration files (TOML)
//! 3. Default values
//!
//! ## Usage
//! ```rust,no_run
//! use listing_search::config::Config;
//!
//! let config = Config::from_file("config.toml").unwrap();
//! println!("Cache TTL: {}ms", config.search.cache_ttl_ms);
//! ```

use crate::errors::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure containing all settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Search dispatch and caching behavior
    pub search: SearchConfig,
    /// Property store backend settings
    pub store: StoreConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Search dispatch and caching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Result cache time-to-live in milliseconds
    pub cache_ttl_ms: i64,
    /// Free text shorter than this (trimmed) carries no search signal
    pub min_free_text_len: usize,
    /// Coalescing delay for follow-up dispatches after filter edits, in ms
    pub debounce_ms: u64,
    /// Maximum number of results requested from the store
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: 300_000,
            min_free_text_len: 3,
            debounce_ms: 50,
            max_results: 100,
        }
    }
}

/// Property store backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend selection: "memory" or "rest"
    pub backend: String,
    /// REST endpoint base URL (rest backend)
    pub base_url: String,
    /// API key sent with every request (rest backend, optional)
    pub api_key: Option<String>,
    /// Path to a JSON listings file (memory backend, optional)
    pub data_path: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            base_url: "http://127.0.0.1:8080".to_string(),
            api_key: None,
            data_path: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Enable structured JSON logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::from_file("config.toml")
    }

    /// Load configuration from a specific file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!("Configuration file not found: {:?}, using defaults", path);
            let mut config = Self::default();
            config.apply_env_overrides()?;
            config.validate()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path).map_err(|e| SearchError::Config {
            message: format!("Failed to read config file {:?}: {}", path, e),
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|e| SearchError::Config {
            message: format!("Failed to parse config file {:?}: {}", path, e),
        })?;

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(backend) = std::env::var("LISTING_SEARCH_STORE_BACKEND") {
            self.store.backend = backend;
        }
        if let Ok(base_url) = std::env::var("LISTING_SEARCH_STORE_URL") {
            self.store.base_url = base_url;
        }
        if let Ok(api_key) = std::env::var("LISTING_SEARCH_API_KEY") {
            self.store.api_key = Some(api_key);
        }
        if let Ok(ttl) = std::env::var("LISTING_SEARCH_CACHE_TTL_MS") {
            self.search.cache_ttl_ms = ttl.parse().map_err(|_| SearchError::Config {
                message: "Invalid value in LISTING_SEARCH_CACHE_TTL_MS".to_string(),
            })?;
        }
        if let Ok(level) = std::env::var("LISTING_SEARCH_LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.search.cache_ttl_ms <= 0 {
            return Err(SearchError::ValidationFailed {
                field: "search.cache_ttl_ms".to_string(),
                reason: "Cache TTL must be positive".to_string(),
            });
        }

        if self.search.min_free_text_len == 0 {
            return Err(SearchError::ValidationFailed {
                field: "search.min_free_text_len".to_string(),
                reason: "Minimum free-text length must be at least one".to_string(),
            });
        }

        if self.search.max_results == 0 {
            return Err(SearchError::ValidationFailed {
                field: "search.max_results".to_string(),
                reason: "Maximum result count cannot be zero".to_string(),
            });
        }

        match self.store.backend.as_str() {
            "memory" | "rest" => {}
            other => {
                return Err(SearchError::ValidationFailed {
                    field: "store.backend".to_string(),
                    reason: format!("Unknown backend '{}', expected 'memory' or 'rest'", other),
                });
            }
        }

        if self.store.backend == "rest" && self.store.base_url.trim().is_empty() {
            return Err(SearchError::ValidationFailed {
                field: "store.base_url".to_string(),
                reason: "REST backend requires a base URL".to_string(),
            });
        }

        Ok(())
    }

    /// Get configuration as TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SearchError::Config {
            message: format!("Failed to serialize config to TOML: {}", e),
        })
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_toml()?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
