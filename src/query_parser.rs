//! # Query Parser Module
//!
//! ## Purpose
//! Turns a free-text search query ("modern 3 bedroom house with pool in
//! Algiers under 50k") into a structured partial filter set.
//!
//! ## Input/Output Specification
//! - **Input**: Raw user query text
//! - **Output**: `ExtractedFilters` with only the fields the text evidenced
//! - **Guarantees**: Pure, deterministic, case-insensitive
//!
//! ## Key Features
//! - Property type, amenity, and city vocabulary matching (all matches kept)
//! - Bedroom count extraction (first match wins)
//! - "under N" / "between N and M" price extraction with `k` suffix scaling
//! - "near X" phrase capture recorded as a free-form feature hint
//!
//! Extraction rules are independent and non-exclusive; a query may assert
//! several dimensions at once. A dimension with no match stays absent so that
//! downstream merging can distinguish "unspecified" from "explicitly empty".

use crate::errors::{Result, SearchError};
use crate::utils::TextUtils;
use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Fixed property type vocabulary
pub const PROPERTY_TYPES: &[&str] = &[
    "house",
    "apartment",
    "villa",
    "condo",
    "studio",
    "duplex",
    "penthouse",
];

/// Fixed amenity vocabulary
pub const AMENITIES: &[&str] = &[
    "pool",
    "garden",
    "garage",
    "balcony",
    "terrace",
    "parking",
    "furnished",
    "air conditioning",
    "wifi",
    "elevator",
    "security",
    "gym",
    "modern",
];

/// Default known-city vocabulary, replaced once the store universe is seeded
pub const DEFAULT_CITIES: &[&str] = &[
    "algiers",
    "oran",
    "constantine",
    "annaba",
    "blida",
    "batna",
    "setif",
    "sidi bel abbes",
    "biskra",
    "tlemcen",
    "bejaia",
    "tizi ouzou",
];

/// Sparse partial projection of a filter set; every field is present only
/// when the parser found positive textual evidence for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFilters {
    /// Property types mentioned in the query
    pub property_types: Option<Vec<String>>,
    /// Bedroom count ("3 bedroom", "2 br")
    pub beds: Option<u32>,
    /// Lower price bound ("between 20k and 80k")
    pub min_price: Option<u64>,
    /// Upper price bound ("under 50k")
    pub max_price: Option<u64>,
    /// City name, title-cased
    pub city: Option<String>,
    /// Amenities mentioned in the query
    pub amenities: Option<Vec<String>>,
    /// Free-form feature hints ("near university")
    pub features: Option<Vec<String>>,
}

/// Natural-language query parser
pub struct QueryParser {
    cities: Vec<String>,
    beds_pattern: Regex,
    under_pattern: Regex,
    between_pattern: Regex,
    near_pattern: Regex,
}

impl QueryParser {
    /// Create a parser with the built-in city vocabulary
    pub fn new() -> Result<Self> {
        Self::with_cities(DEFAULT_CITIES.iter().map(|c| c.to_string()))
    }

    /// Create a parser with a specific city vocabulary (seeded from the store)
    pub fn with_cities(cities: impl IntoIterator<Item = String>) -> Result<Self> {
        Ok(Self {
            cities: cities.into_iter().map(|c| c.to_lowercase()).collect(),
            beds_pattern: compile(r"(\d+)\s*(?:bedrooms?|beds?|br)\b")?,
            under_pattern: compile(r"under\s*\$?(\d+)(k)?\b")?,
            between_pattern: compile(r"between\s*\$?(\d+)(k)?\s*(?:and|-)\s*\$?(\d+)(k)?\b")?,
            near_pattern: compile(r"near\s+(.+?)(?:\s+(?:in|with|under|between)\b|$)")?,
        })
    }

    /// Parse a free-text query into structured partial filters.
    ///
    /// Pure and deterministic; matching is case-insensitive over an
    /// NFC-normalized lower-cased copy of the input.
    pub fn parse(&self, query: &str) -> ExtractedFilters {
        let text = normalize(query);
        let mut extracted = ExtractedFilters::default();

        self.extract_property_types(&text, &mut extracted);
        self.extract_beds(&text, &mut extracted);
        self.extract_amenities(&text, &mut extracted);
        // "between" is evaluated after "under" and assigns unconditionally,
        // so it wins when both patterns match.
        self.extract_price_under(&text, &mut extracted);
        self.extract_price_between(&text, &mut extracted);
        self.extract_city(&text, &mut extracted);
        self.extract_near_hint(&text, &mut extracted);

        extracted
    }

    fn extract_property_types(&self, text: &str, out: &mut ExtractedFilters) {
        let matches: Vec<String> = PROPERTY_TYPES
            .iter()
            .filter(|t| text.contains(*t))
            .map(|t| t.to_string())
            .collect();
        if !matches.is_empty() {
            out.property_types = Some(matches);
        }
    }

    fn extract_beds(&self, text: &str, out: &mut ExtractedFilters) {
        if let Some(captures) = self.beds_pattern.captures(text) {
            if let Ok(beds) = captures[1].parse::<u32>() {
                out.beds = Some(beds);
            }
        }
    }

    fn extract_amenities(&self, text: &str, out: &mut ExtractedFilters) {
        let matches: Vec<String> = AMENITIES
            .iter()
            .filter(|a| text.contains(*a))
            .map(|a| a.to_string())
            .collect();
        if !matches.is_empty() {
            out.amenities = Some(matches);
        }
    }

    fn extract_price_under(&self, text: &str, out: &mut ExtractedFilters) {
        if let Some(captures) = self.under_pattern.captures(text) {
            if let Some(amount) = parse_scaled(&captures[1], captures.get(2).is_some()) {
                out.max_price = Some(amount);
            }
        }
    }

    fn extract_price_between(&self, text: &str, out: &mut ExtractedFilters) {
        if let Some(captures) = self.between_pattern.captures(text) {
            let low = parse_scaled(&captures[1], captures.get(2).is_some());
            let high = parse_scaled(&captures[3], captures.get(4).is_some());
            if let (Some(low), Some(high)) = (low, high) {
                out.min_price = Some(low);
                out.max_price = Some(high);
            }
        }
    }

    fn extract_city(&self, text: &str, out: &mut ExtractedFilters) {
        for city in &self.cities {
            if text.contains(city.as_str()) {
                out.city = Some(TextUtils::title_case(city));
                return;
            }
        }
    }

    fn extract_near_hint(&self, text: &str, out: &mut ExtractedFilters) {
        if let Some(captures) = self.near_pattern.captures(text) {
            let place = captures[1].trim();
            if place.is_empty() {
                return;
            }
            // A known city in the capture is already handled as a structured
            // city filter, not a free-form hint.
            if self.cities.iter().any(|c| place.contains(c.as_str())) {
                return;
            }
            out.features
                .get_or_insert_with(Vec::new)
                .push(format!("near {}", place));
        }
    }
}

/// Scan text for amenity vocabulary hits; used by the dispatcher to union
/// free-text amenities into the explicit selection.
pub fn scan_amenities(text: &str) -> Vec<String> {
    let lowered = normalize(text);
    AMENITIES
        .iter()
        .filter(|a| lowered.contains(*a))
        .map(|a| a.to_string())
        .collect()
}

fn normalize(text: &str) -> String {
    let normalized: String = text.nfc().collect();
    normalized
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_scaled(digits: &str, k_suffix: bool) -> Option<u64> {
    let value: u64 = digits.parse().ok()?;
    if k_suffix {
        value.checked_mul(1000)
    } else {
        Some(value)
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| SearchError::InvalidPattern {
        pattern: pattern.to_string(),
        details: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> QueryParser {
        QueryParser::new().unwrap()
    }

    #[test]
    fn parse_is_idempotent() {
        let parser = parser();
        let query = "modern 3 bedroom house with pool in Algiers under 50k";
        assert_eq!(parser.parse(query), parser.parse(query));
    }

    #[test]
    fn full_query_extracts_every_dimension() {
        let extracted = parser().parse("modern 3 bedroom house with pool in Algiers under 50k");

        assert_eq!(
            extracted.property_types,
            Some(vec!["house".to_string()])
        );
        assert_eq!(extracted.beds, Some(3));
        let amenities = extracted.amenities.unwrap();
        assert!(amenities.contains(&"pool".to_string()));
        assert!(amenities.contains(&"modern".to_string()));
        assert_eq!(extracted.city, Some("Algiers".to_string()));
        assert_eq!(extracted.max_price, Some(50_000));
        assert_eq!(extracted.min_price, None);
    }

    #[test]
    fn between_wins_over_under() {
        let extracted = parser().parse("between 20k and 80k but ideally under 50k");
        assert_eq!(extracted.min_price, Some(20_000));
        assert_eq!(extracted.max_price, Some(80_000));
    }

    #[test]
    fn between_accepts_dash_separator() {
        let extracted = parser().parse("between $30k - $60k");
        assert_eq!(extracted.min_price, Some(30_000));
        assert_eq!(extracted.max_price, Some(60_000));
    }

    #[test]
    fn prices_without_k_are_taken_literally() {
        let extracted = parser().parse("under $250000");
        assert_eq!(extracted.max_price, Some(250_000));
    }

    #[test]
    fn overflowing_scaled_price_is_ignored() {
        let extracted = parser().parse("under $18446744073709551615k");
        assert_eq!(extracted.max_price, None);
    }

    #[test]
    fn multiple_property_types_are_all_kept() {
        let extracted = parser().parse("villa or apartment in Oran");
        let types = extracted.property_types.unwrap();
        assert!(types.contains(&"apartment".to_string()));
        assert!(types.contains(&"villa".to_string()));
        assert_eq!(extracted.city, Some("Oran".to_string()));
    }

    #[test]
    fn first_bedroom_match_wins() {
        let extracted = parser().parse("3 bedroom or maybe 4 bed");
        assert_eq!(extracted.beds, Some(3));
    }

    #[test]
    fn bed_abbreviations_are_recognized() {
        assert_eq!(parser().parse("2 br apartment").beds, Some(2));
        assert_eq!(parser().parse("4 beds").beds, Some(4));
    }

    #[test]
    fn near_unknown_place_becomes_feature_hint() {
        let extracted = parser().parse("apartment near the university in Algiers");
        let features = extracted.features.unwrap();
        assert_eq!(features, vec!["near the university".to_string()]);
    }

    #[test]
    fn near_known_city_is_not_a_feature_hint() {
        let extracted = parser().parse("house near oran");
        assert!(extracted.features.is_none());
    }

    #[test]
    fn no_match_leaves_fields_absent() {
        let extracted = parser().parse("something completely unrelated");
        assert_eq!(extracted, ExtractedFilters::default());
    }

    #[test]
    fn matching_is_case_insensitive() {
        let extracted = parser().parse("HOUSE WITH POOL IN ALGIERS");
        assert_eq!(extracted.property_types, Some(vec!["house".to_string()]));
        assert_eq!(extracted.city, Some("Algiers".to_string()));
    }

    #[test]
    fn multiword_city_is_title_cased() {
        let extracted = parser().parse("duplex in sidi bel abbes");
        assert_eq!(extracted.city, Some("Sidi Bel Abbes".to_string()));
    }

    #[test]
    fn scan_amenities_finds_vocabulary_hits() {
        let hits = scan_amenities("Furnished with WiFi and a big Garden");
        assert!(hits.contains(&"furnished".to_string()));
        assert!(hits.contains(&"wifi".to_string()));
        assert!(hits.contains(&"garden".to_string()));
    }
}
