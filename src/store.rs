//! # Property Store Module
//!
//! ## Purpose
//! The record-store seam of the search core. Everything the core needs from
//! persistence is expressed as one trait: a conjunctive search operation and
//! a discovery bundle seeding the session universe (price/area ceilings,
//! known cities).
//!
//! ## Input/Output Specification
//! - **Input**: Effective free text plus a conjunctive `QueryCriteria`
//! - **Output**: Ordered property lists; discovery scalars/lists
//! - **Failure**: Any transport/backend failure surfaces as `SearchError::Query`
//!   or `SearchError::Discovery`; criteria are never partially applied
//!
//! Two implementations ship with the crate: `MemoryStore` for tests and local
//! data files, and `RestStore` for a remote HTTP record store.

use crate::config::StoreConfig;
use crate::errors::{Result, SearchError};
use crate::filters::SearchParams;
use crate::{Property, SortOption};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

/// Conjunctive search criteria sent to the store. Empty sets mean
/// "no restriction"; cities are guaranteed non-empty by the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryCriteria {
    pub cities: BTreeSet<String>,
    pub property_types: BTreeSet<String>,
    pub listing_types: BTreeSet<String>,
    pub min_price: u64,
    pub max_price: u64,
    pub min_beds: u32,
    pub min_baths: u32,
    pub min_living_area: u64,
    pub max_living_area: u64,
    /// Required amenity/feature tags (explicit selection unioned with
    /// free-text hits)
    pub features: BTreeSet<String>,
    pub sort: SortOption,
    /// Maximum number of results to return
    pub limit: usize,
}

impl QueryCriteria {
    /// Build criteria from a normalized parameter snapshot
    pub fn from_params(params: &SearchParams, limit: usize) -> Self {
        Self {
            cities: params.cities.clone(),
            property_types: params.property_types.clone(),
            listing_types: params.listing_types.clone(),
            min_price: params.min_price,
            max_price: params.max_price,
            min_beds: params.min_beds,
            min_baths: params.min_baths,
            min_living_area: params.min_living_area,
            max_living_area: params.max_living_area,
            features: params.amenities.clone(),
            sort: params.sort,
            limit,
        }
    }
}

/// The record-store contract consumed by the search core
#[async_trait]
pub trait PropertyStore: Send + Sync {
    /// Run one conjunctive search; all supplied criteria are AND-ed
    async fn search_properties(
        &self,
        free_text: &str,
        criteria: &QueryCriteria,
    ) -> Result<Vec<Property>>;

    /// Maximum observed property price (session price ceiling)
    async fn max_property_price(&self) -> Result<u64>;

    /// Maximum observed living area (session area ceiling)
    async fn max_living_area(&self) -> Result<u64>;

    /// All cities with at least one listing
    async fn all_cities(&self) -> Result<Vec<String>>;
}

/// In-process store over a fixed listing collection
pub struct MemoryStore {
    properties: Vec<Property>,
}

impl MemoryStore {
    /// Create a store over the given listings
    pub fn new(properties: Vec<Property>) -> Self {
        Self { properties }
    }

    /// Load listings from a JSON file (an array of `Property` records)
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let properties: Vec<Property> = serde_json::from_str(&content)?;
        Ok(Self::new(properties))
    }

    fn matches(property: &Property, free_text: &str, criteria: &QueryCriteria) -> bool {
        if !criteria
            .cities
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&property.city))
        {
            return false;
        }
        if !criteria.property_types.is_empty()
            && !criteria.property_types.contains(&property.property_type)
        {
            return false;
        }
        if !criteria.listing_types.is_empty()
            && !criteria.listing_types.contains(&property.listing_type)
        {
            return false;
        }
        if property.price < criteria.min_price || property.price > criteria.max_price {
            return false;
        }
        if property.beds < criteria.min_beds || property.baths < criteria.min_baths {
            return false;
        }
        if property.living_area < criteria.min_living_area
            || property.living_area > criteria.max_living_area
        {
            return false;
        }
        if !criteria.features.iter().all(|f| {
            property
                .amenities
                .iter()
                .any(|a| a.eq_ignore_ascii_case(f))
        }) {
            return false;
        }
        if !free_text.is_empty() {
            let needle = free_text.to_lowercase();
            let haystack =
                format!("{} {}", property.title, property.description).to_lowercase();
            if !needle.split_whitespace().any(|w| haystack.contains(w)) {
                return false;
            }
        }
        true
    }

    fn sort_results(results: &mut [Property], sort: SortOption) {
        match sort {
            SortOption::Relevance => {}
            SortOption::PriceAsc => results.sort_by_key(|p| p.price),
            SortOption::PriceDesc => results.sort_by_key(|p| std::cmp::Reverse(p.price)),
            SortOption::Newest => results.sort_by_key(|p| std::cmp::Reverse(p.listed_at)),
        }
    }
}

#[async_trait]
impl PropertyStore for MemoryStore {
    async fn search_properties(
        &self,
        free_text: &str,
        criteria: &QueryCriteria,
    ) -> Result<Vec<Property>> {
        let mut results: Vec<Property> = self
            .properties
            .iter()
            .filter(|p| Self::matches(p, free_text, criteria))
            .cloned()
            .collect();
        Self::sort_results(&mut results, criteria.sort);
        results.truncate(criteria.limit);
        Ok(results)
    }

    async fn max_property_price(&self) -> Result<u64> {
        Ok(self.properties.iter().map(|p| p.price).max().unwrap_or(0))
    }

    async fn max_living_area(&self) -> Result<u64> {
        Ok(self
            .properties
            .iter()
            .map(|p| p.living_area)
            .max()
            .unwrap_or(0))
    }

    async fn all_cities(&self) -> Result<Vec<String>> {
        let cities: BTreeSet<String> =
            self.properties.iter().map(|p| p.city.clone()).collect();
        Ok(cities.into_iter().collect())
    }
}

/// HTTP-backed store for a remote record-store endpoint
pub struct RestStore {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct MaxValueResponse {
    max: u64,
}

impl RestStore {
    /// Build a client for the configured endpoint
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(api_key) = &config.api_key {
            headers.insert(
                "apikey",
                api_key.parse().map_err(|e| SearchError::Config {
                    message: format!("Invalid API key format: {}", e),
                })?,
            );
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers(headers)
            .user_agent("listing-search/0.1")
            .build()
            .map_err(|e| SearchError::Query {
                details: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| SearchError::Query {
                details: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Query {
                details: format!("{} returned {}", path, status),
            });
        }

        response.json::<T>().await.map_err(|e| SearchError::Query {
            details: format!("malformed response from {}: {}", path, e),
        })
    }
}

#[async_trait]
impl PropertyStore for RestStore {
    async fn search_properties(
        &self,
        free_text: &str,
        criteria: &QueryCriteria,
    ) -> Result<Vec<Property>> {
        let join = |set: &BTreeSet<String>| set.iter().cloned().collect::<Vec<_>>().join(",");

        let mut query = vec![
            ("cities".to_string(), join(&criteria.cities)),
            ("min_price".to_string(), criteria.min_price.to_string()),
            ("max_price".to_string(), criteria.max_price.to_string()),
            ("min_beds".to_string(), criteria.min_beds.to_string()),
            ("min_baths".to_string(), criteria.min_baths.to_string()),
            (
                "min_living_area".to_string(),
                criteria.min_living_area.to_string(),
            ),
            (
                "max_living_area".to_string(),
                criteria.max_living_area.to_string(),
            ),
            ("limit".to_string(), criteria.limit.to_string()),
        ];
        if !criteria.property_types.is_empty() {
            query.push(("property_types".to_string(), join(&criteria.property_types)));
        }
        if !criteria.listing_types.is_empty() {
            query.push(("listing_types".to_string(), join(&criteria.listing_types)));
        }
        if !criteria.features.is_empty() {
            query.push(("features".to_string(), join(&criteria.features)));
        }
        if !free_text.is_empty() {
            query.push(("q".to_string(), free_text.to_string()));
        }

        self.get_json("/properties", &query).await
    }

    async fn max_property_price(&self) -> Result<u64> {
        let response: MaxValueResponse = self
            .get_json("/properties/max_price", &[])
            .await
            .map_err(|e| SearchError::Discovery {
                operation: "max_property_price".to_string(),
                details: e.to_string(),
            })?;
        Ok(response.max)
    }

    async fn max_living_area(&self) -> Result<u64> {
        let response: MaxValueResponse = self
            .get_json("/properties/max_living_area", &[])
            .await
            .map_err(|e| SearchError::Discovery {
                operation: "max_living_area".to_string(),
                details: e.to_string(),
            })?;
        Ok(response.max)
    }

    async fn all_cities(&self) -> Result<Vec<String>> {
        self.get_json("/cities", &[])
            .await
            .map_err(|e| SearchError::Discovery {
                operation: "all_cities".to_string(),
                details: e.to_string(),
            })
    }
}
