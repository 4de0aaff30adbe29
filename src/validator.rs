//! # Filter Validation Module
//!
//! ## Purpose
//! Intersects parser output with the universe of currently known valid values
//! and discards anything unrecognized, so free-text noise never reaches the
//! filter state.
//!
//! ## Input/Output Specification
//! - **Input**: `ExtractedFilters` from the query parser, the known universe
//! - **Output**: A new `ExtractedFilters` containing only universe members
//! - **Guarantees**: Pure (never mutates its input), never fails — empty
//!   universes simply drop everything extracted
//!
//! Dropped values are routine filtering noise, observable at debug level only.

use crate::query_parser::ExtractedFilters;
use std::collections::BTreeSet;

/// The universe of currently valid filter values, discovered once per session
/// from the property store.
#[derive(Debug, Clone, Default)]
pub struct FilterUniverse {
    /// Known city names (as reported by the store)
    pub cities: BTreeSet<String>,
    /// Known property types
    pub property_types: BTreeSet<String>,
    /// Known listing types
    pub listing_types: BTreeSet<String>,
    /// Known amenity vocabulary
    pub amenities: BTreeSet<String>,
    /// Maximum observed property price (price ceiling)
    pub max_price: u64,
    /// Maximum observed living area (area ceiling)
    pub max_living_area: u64,
}

impl FilterUniverse {
    fn contains_city(&self, city: &str) -> bool {
        self.cities.iter().any(|c| c.eq_ignore_ascii_case(city))
    }
}

/// Validates extracted filters against the known universe
pub struct FilterValidator;

impl FilterValidator {
    /// Drop any extracted value not present in the universe and clamp numeric
    /// bounds to `[0, ceiling]`.
    pub fn validate(extracted: &ExtractedFilters, universe: &FilterUniverse) -> ExtractedFilters {
        let mut validated = ExtractedFilters::default();

        if let Some(types) = &extracted.property_types {
            let kept: Vec<String> = types
                .iter()
                .filter(|t| universe.property_types.contains(*t))
                .cloned()
                .collect();
            if kept.len() < types.len() {
                tracing::debug!(
                    dropped = types.len() - kept.len(),
                    "dropped unrecognized property types"
                );
            }
            if !kept.is_empty() {
                validated.property_types = Some(kept);
            }
        }

        if let Some(amenities) = &extracted.amenities {
            let kept: Vec<String> = amenities
                .iter()
                .filter(|a| universe.amenities.contains(*a))
                .cloned()
                .collect();
            if kept.len() < amenities.len() {
                tracing::debug!(
                    dropped = amenities.len() - kept.len(),
                    "dropped unrecognized amenities"
                );
            }
            if !kept.is_empty() {
                validated.amenities = Some(kept);
            }
        }

        if let Some(city) = &extracted.city {
            if universe.contains_city(city) {
                validated.city = Some(city.clone());
            } else {
                tracing::debug!(city = %city, "dropped unknown city");
            }
        }

        validated.beds = extracted.beds;

        if let Some(max_price) = extracted.max_price {
            validated.max_price = Some(max_price.min(universe.max_price));
        }
        if let Some(min_price) = extracted.min_price {
            validated.min_price = Some(min_price.min(universe.max_price));
        }

        // Free-form feature hints have no universe; they pass through.
        validated.features = extracted.features.clone();

        validated
    }
}
