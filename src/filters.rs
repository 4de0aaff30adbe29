//! # Filter State Module
//!
//! ## Purpose
//! The authoritative record of all active filter dimensions: location scope,
//! price and area ranges, bed/bath minimums, category sets, amenities, and
//! the free-text query, plus the derived active-filter count.
//!
//! ## Input/Output Specification
//! - **Input**: UI filter edits, validated parser output, session ceilings
//! - **Output**: Normalized `SearchParams` snapshots for dispatch and caching
//! - **Invariants**: `0 <= min <= max <= ceiling` for both price and living
//!   area; resets snap ranges back to `[0, ceiling]`, never to unbounded or
//!   negative values; city selection is mandatory scope, not a filter
//!
//! City selection is deliberately excluded from `active_filter_count` and
//! survives `reset`: without a city there is no search at all.

use crate::query_parser::ExtractedFilters;
use crate::SortOption;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The central filter value object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSet {
    /// Raw user query, possibly empty
    pub free_text: String,
    /// Selected location scope; empty means no search is executed
    pub cities: BTreeSet<String>,
    /// Property type restrictions; empty means "no restriction"
    pub property_types: BTreeSet<String>,
    /// Listing type restrictions; empty means "no restriction"
    pub listing_types: BTreeSet<String>,
    /// Inclusive price lower bound
    pub min_price: u64,
    /// Inclusive price upper bound
    pub max_price: u64,
    /// Inclusive bedroom lower bound
    pub min_beds: u32,
    /// Inclusive bathroom lower bound
    pub min_baths: u32,
    /// Inclusive living area lower bound
    pub min_living_area: u64,
    /// Inclusive living area upper bound
    pub max_living_area: u64,
    /// Selected amenity tags
    pub amenities: BTreeSet<String>,
    /// Result ordering
    pub sort: SortOption,
    /// Session price ceiling (max observed property price)
    pub price_ceiling: u64,
    /// Session living-area ceiling (max observed living area)
    pub area_ceiling: u64,
}

impl Default for FilterSet {
    fn default() -> Self {
        Self::new(u64::MAX, u64::MAX)
    }
}

impl FilterSet {
    /// Create a filter set with every dimension at its default for the given
    /// session ceilings.
    pub fn new(price_ceiling: u64, area_ceiling: u64) -> Self {
        Self {
            free_text: String::new(),
            cities: BTreeSet::new(),
            property_types: BTreeSet::new(),
            listing_types: BTreeSet::new(),
            min_price: 0,
            max_price: price_ceiling,
            min_beds: 0,
            min_baths: 0,
            min_living_area: 0,
            max_living_area: area_ceiling,
            amenities: BTreeSet::new(),
            sort: SortOption::default(),
            price_ceiling,
            area_ceiling,
        }
    }

    /// Install session ceilings discovered from the store. Ceilings never
    /// shrink below a bound currently set; an upper bound still sitting at
    /// the old ceiling follows the new one.
    pub fn set_ceilings(&mut self, price_ceiling: u64, area_ceiling: u64) {
        let price_ceiling = price_ceiling.max(self.min_price);
        if self.max_price == self.price_ceiling {
            // Default upper bound follows the new ceiling.
            self.max_price = price_ceiling;
            self.price_ceiling = price_ceiling;
        } else {
            // A set upper bound caps the ceiling from below, never the
            // other way around.
            self.price_ceiling = price_ceiling.max(self.max_price);
        }

        let area_ceiling = area_ceiling.max(self.min_living_area);
        if self.max_living_area == self.area_ceiling {
            self.max_living_area = area_ceiling;
            self.area_ceiling = area_ceiling;
        } else {
            self.area_ceiling = area_ceiling.max(self.max_living_area);
        }
    }

    /// Count independently-toggleable dimensions currently non-default.
    /// Cities are mandatory scope and never counted.
    pub fn active_filter_count(&self) -> usize {
        let mut count = 0;
        if !self.property_types.is_empty() {
            count += 1;
        }
        if !self.listing_types.is_empty() {
            count += 1;
        }
        if self.min_beds > 0 {
            count += 1;
        }
        if self.min_baths > 0 {
            count += 1;
        }
        if self.min_living_area > 0 {
            count += 1;
        }
        if self.max_living_area < self.area_ceiling {
            count += 1;
        }
        if !self.amenities.is_empty() {
            count += 1;
        }
        count
    }

    /// Restore every dimension to its default except the city selection.
    pub fn reset_preserving_cities(&mut self) {
        let cities = std::mem::take(&mut self.cities);
        let price_ceiling = self.price_ceiling;
        let area_ceiling = self.area_ceiling;
        *self = Self::new(price_ceiling, area_ceiling);
        self.cities = cities;
    }

    /// Remove one value from a set-valued dimension, or reset a scalar/range
    /// dimension to its default. Returns `false` for unrecognized dimension
    /// names (a no-op).
    pub fn remove_filter(&mut self, dimension: &str, value: Option<&str>) -> bool {
        match dimension {
            "property_types" => remove_or_clear(&mut self.property_types, value),
            "listing_types" => remove_or_clear(&mut self.listing_types, value),
            "amenities" => remove_or_clear(&mut self.amenities, value),
            "price" => {
                self.min_price = 0;
                self.max_price = self.price_ceiling;
            }
            "beds" => self.min_beds = 0,
            "baths" => self.min_baths = 0,
            "living_area" => {
                self.min_living_area = 0;
                self.max_living_area = self.area_ceiling;
            }
            "free_text" => self.free_text.clear(),
            other => {
                tracing::debug!(dimension = %other, "ignoring unrecognized filter dimension");
                return false;
            }
        }
        true
    }

    /// Merge validated free-text extraction into the filter state. Present
    /// fields overwrite or extend; absent fields leave dimensions untouched.
    pub fn apply_extracted(&mut self, extracted: &ExtractedFilters) {
        if let Some(types) = &extracted.property_types {
            self.property_types.extend(types.iter().cloned());
        }
        if let Some(beds) = extracted.beds {
            self.min_beds = beds;
        }
        if let Some(min_price) = extracted.min_price {
            self.min_price = min_price.min(self.price_ceiling);
        }
        if let Some(max_price) = extracted.max_price {
            self.max_price = max_price.min(self.price_ceiling).max(self.min_price);
        }
        if let Some(city) = &extracted.city {
            self.cities.insert(city.clone());
        }
        if let Some(amenities) = &extracted.amenities {
            self.amenities.extend(amenities.iter().cloned());
        }
    }

    /// Build the normalized parameter snapshot used as the cache key and the
    /// store request. `effective_free_text` and `merged_amenities` come from
    /// the dispatcher's free-text merge policy.
    pub fn snapshot(
        &self,
        effective_free_text: &str,
        merged_amenities: BTreeSet<String>,
    ) -> SearchParams {
        SearchParams {
            free_text: effective_free_text.to_string(),
            cities: self.cities.clone(),
            property_types: self.property_types.clone(),
            listing_types: self.listing_types.clone(),
            min_price: self.min_price,
            max_price: self.max_price,
            min_beds: self.min_beds,
            min_baths: self.min_baths,
            min_living_area: self.min_living_area,
            max_living_area: self.max_living_area,
            amenities: merged_amenities,
            sort: self.sort,
        }
    }
}

/// Normalized, deep-equal comparable snapshot of one search request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    pub free_text: String,
    pub cities: BTreeSet<String>,
    pub property_types: BTreeSet<String>,
    pub listing_types: BTreeSet<String>,
    pub min_price: u64,
    pub max_price: u64,
    pub min_beds: u32,
    pub min_baths: u32,
    pub min_living_area: u64,
    pub max_living_area: u64,
    pub amenities: BTreeSet<String>,
    pub sort: SortOption,
}

fn remove_or_clear(set: &mut BTreeSet<String>, value: Option<&str>) {
    match value {
        Some(value) => {
            set.remove(value);
        }
        None => set.clear(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters() -> FilterSet {
        FilterSet::new(1_000_000, 800)
    }

    #[test]
    fn defaults_have_no_active_filters() {
        assert_eq!(filters().active_filter_count(), 0);
    }

    #[test]
    fn city_selection_is_never_counted() {
        let mut f = filters();
        f.cities.insert("Algiers".to_string());
        f.cities.insert("Oran".to_string());
        assert_eq!(f.active_filter_count(), 0);
    }

    #[test]
    fn each_non_default_dimension_counts_once() {
        let mut f = filters();
        f.property_types.insert("house".to_string());
        f.listing_types.insert("sale".to_string());
        f.min_beds = 2;
        f.min_baths = 1;
        f.min_living_area = 50;
        f.max_living_area = 400;
        f.amenities.insert("pool".to_string());
        assert_eq!(f.active_filter_count(), 7);
    }

    #[test]
    fn reset_preserves_cities_and_clears_the_rest() {
        let mut f = filters();
        f.cities.insert("Algiers".to_string());
        f.min_beds = 3;
        f.amenities.insert("pool".to_string());
        f.max_price = 200_000;

        f.reset_preserving_cities();

        assert_eq!(f.cities, ["Algiers".to_string()].into());
        assert_eq!(f.min_beds, 0);
        assert!(f.amenities.is_empty());
        assert_eq!(f.max_price, 1_000_000);
        assert_eq!(f.active_filter_count(), 0);
    }

    #[test]
    fn remove_single_amenity_keeps_the_others() {
        let mut f = filters();
        f.amenities.insert("pool".to_string());
        f.amenities.insert("garden".to_string());

        assert!(f.remove_filter("amenities", Some("pool")));
        assert_eq!(f.amenities, ["garden".to_string()].into());
    }

    #[test]
    fn remove_without_value_clears_the_set() {
        let mut f = filters();
        f.property_types.insert("house".to_string());
        f.property_types.insert("villa".to_string());

        assert!(f.remove_filter("property_types", None));
        assert!(f.property_types.is_empty());
    }

    #[test]
    fn remove_range_dimension_snaps_to_ceiling() {
        let mut f = filters();
        f.min_price = 10_000;
        f.max_price = 200_000;

        assert!(f.remove_filter("price", None));
        assert_eq!(f.min_price, 0);
        assert_eq!(f.max_price, 1_000_000);
    }

    #[test]
    fn unrecognized_dimension_is_a_noop() {
        let mut f = filters();
        f.min_beds = 2;
        assert!(!f.remove_filter("garages", None));
        assert_eq!(f.min_beds, 2);
    }

    #[test]
    fn ceilings_never_shrink_below_set_bounds() {
        let mut f = filters();
        f.min_price = 500_000;
        f.set_ceilings(100_000, 800);
        assert!(f.price_ceiling >= f.min_price);
        assert!(f.max_price >= f.min_price);

        // Set upper bounds survive a lower discovered ceiling too.
        let mut f = filters();
        f.max_price = 500_000;
        f.max_living_area = 400;
        f.set_ceilings(100_000, 200);
        assert_eq!(f.max_price, 500_000);
        assert_eq!(f.price_ceiling, 500_000);
        assert_eq!(f.max_living_area, 400);
        assert_eq!(f.area_ceiling, 400);
    }

    #[test]
    fn default_upper_bound_follows_a_raised_ceiling() {
        let mut f = filters();
        f.set_ceilings(2_000_000, 1_000);
        assert_eq!(f.max_price, 2_000_000);
        assert_eq!(f.max_living_area, 1_000);
        assert_eq!(f.active_filter_count(), 0);
    }

    #[test]
    fn apply_extracted_merges_present_fields_only() {
        let mut f = filters();
        f.amenities.insert("garden".to_string());

        let extracted = ExtractedFilters {
            property_types: Some(vec!["house".to_string()]),
            beds: Some(3),
            max_price: Some(50_000),
            city: Some("Algiers".to_string()),
            amenities: Some(vec!["pool".to_string()]),
            ..Default::default()
        };
        f.apply_extracted(&extracted);

        assert_eq!(f.property_types, ["house".to_string()].into());
        assert_eq!(f.min_beds, 3);
        assert_eq!(f.max_price, 50_000);
        assert_eq!(f.cities, ["Algiers".to_string()].into());
        assert_eq!(
            f.amenities,
            ["garden".to_string(), "pool".to_string()].into()
        );
        // Untouched dimensions keep their defaults.
        assert_eq!(f.min_price, 0);
        assert_eq!(f.min_baths, 0);
    }

    #[test]
    fn identical_snapshots_compare_equal() {
        let mut f = filters();
        f.cities.insert("Oran".to_string());
        let a = f.snapshot("", BTreeSet::new());
        let b = f.snapshot("", BTreeSet::new());
        assert_eq!(a, b);

        let c = f.snapshot("pool", BTreeSet::new());
        assert_ne!(a, c);
    }
}
