//! # Listing Search Core
//!
//! ## Overview
//! This library implements the search and filter core of a real-estate listing
//! application: a natural-language query extractor, a validated multi-dimension
//! filter state, a single-slot time-bounded result cache, and a search
//! dispatcher that guarantees at most one in-flight query against the property
//! store.
//!
//! ## Architecture
//! The system is composed of several key modules:
//! - `query_parser`: Free-text query extraction into structured partial filters
//! - `validator`: Intersection of extracted filters with the known universe
//! - `filters`: The authoritative filter state and parameter snapshots
//! - `cache`: Single-slot, parameter-keyed, time-bounded result memo
//! - `store`: The property record-store seam (in-memory and REST backends)
//! - `dispatcher`: End-to-end search orchestration and filter reconciliation
//! - `config`: Configuration management and settings
//! - `errors`: Centralized error handling and types
//!
//! ## Input/Output Specification
//! - **Input**: Free-text queries, UI filter edits, property store responses
//! - **Output**: Ordered property result lists plus loading/error state
//! - **Guarantees**: Deterministic parsing, at-most-one in-flight search,
//!   no stale results shown next to an error
//!
//! ## Usage
//! ```rust,no_run
//! use listing_search::{Config, MemoryStore, SearchController};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("config.toml")?;
//!     let store = Arc::new(MemoryStore::new(Vec::new()));
//!     let controller = Arc::new(SearchController::new(config.search, store)?);
//!     controller.seed_universe().await?;
//!     controller.set_cities(["Algiers".to_string()]);
//!     controller.dispatch().await;
//!     println!("Found {} results", controller.results().len());
//!     Ok(())
//! }
//! ```

// Core modules
pub mod cache;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod filters;
pub mod query_parser;
pub mod store;
pub mod validator;

// Utilities
pub mod utils;

// Re-exports for convenience
pub use cache::{CacheEntry, SearchCache};
pub use config::Config;
pub use dispatcher::SearchController;
pub use errors::{Result, SearchError};
pub use filters::{FilterSet, SearchParams};
pub use query_parser::{ExtractedFilters, QueryParser};
pub use store::{MemoryStore, PropertyStore, QueryCriteria, RestStore};
pub use validator::{FilterUniverse, FilterValidator};

// Core types used throughout the system
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for property listings
pub type PropertyId = Uuid;

/// A property listing record. The search core treats this as opaque beyond
/// passing whole records through; only the in-memory store inspects fields
/// to answer queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    /// Unique listing identifier
    pub id: PropertyId,
    /// Listing title
    pub title: String,
    /// Free-form description
    pub description: String,
    /// City the property is located in
    pub city: String,
    /// Property type (house, apartment, villa, ...)
    pub property_type: String,
    /// Listing type (sale, rent, ...)
    pub listing_type: String,
    /// Asking price
    pub price: u64,
    /// Bedroom count
    pub beds: u32,
    /// Bathroom count
    pub baths: u32,
    /// Living area in square meters
    pub living_area: u64,
    /// Amenity tags
    pub amenities: Vec<String>,
    /// When the listing was published
    pub listed_at: DateTime<Utc>,
}

/// Result ordering options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortOption {
    /// Store-defined relevance order
    #[default]
    Relevance,
    /// Cheapest first
    PriceAsc,
    /// Most expensive first
    PriceDesc,
    /// Most recently listed first
    Newest,
}
