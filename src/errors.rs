//! # Error Handling Module
//!
//! ## Purpose
//! Centralized error handling for the listing search core, providing structured
//! error types and conversion utilities for all components.
//!
//! ## Input/Output Specification
//! - **Input**: Error conditions from configuration, parsing, the store seam
//! - **Output**: Structured error types with context
//! - **Error Categories**: Configuration, Parsing, Validation, Store, System
//!
//! ## Key Features
//! - Struct-variant error types with detailed context
//! - Automatic conversion from common library errors
//! - User-facing one-line messages for store failures
//! - Recovery classification for retry decisions

use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, SearchError>;

/// Error types for the listing search core
#[derive(Debug, Error)]
pub enum SearchError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors (programming/contract level, not routine filter drops)
    #[error("Validation failed for field '{field}': {reason}")]
    ValidationFailed { field: String, reason: String },

    /// Store query rejected or transport failed
    #[error("Property store query failed: {details}")]
    Query { details: String },

    /// Store discovery call failed (price/area ceilings, city list)
    #[error("Universe discovery failed for '{operation}': {details}")]
    Discovery { operation: String, details: String },

    /// Regex pattern failed to compile
    #[error("Invalid extraction pattern '{pattern}': {details}")]
    InvalidPattern { pattern: String, details: String },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Internal system errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SearchError {
    /// Check if the error is recoverable (the next dispatch may succeed)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SearchError::Query { .. } | SearchError::Discovery { .. } | SearchError::Http(_)
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            SearchError::Config { .. } | SearchError::Toml(_) => "configuration",
            SearchError::ValidationFailed { .. } => "validation",
            SearchError::Query { .. } | SearchError::Discovery { .. } | SearchError::Http(_) => {
                "store"
            }
            SearchError::InvalidPattern { .. } => "parsing",
            SearchError::Io(_) | SearchError::Json(_) | SearchError::Internal { .. } => "system",
        }
    }

    /// One-line message suitable for a transient user-facing notice
    pub fn user_message(&self) -> String {
        match self {
            SearchError::Query { .. } | SearchError::Http(_) => {
                "Search failed, please try again".to_string()
            }
            SearchError::Discovery { .. } => {
                "Could not load search settings, please retry".to_string()
            }
            other => other.to_string(),
        }
    }
}
