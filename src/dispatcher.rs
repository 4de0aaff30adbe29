//! # Search Dispatch Module
//!
//! ## Purpose
//! Orchestrates one end-to-end search: build the normalized request, consult
//! the cache, query the property store, and publish results, loading, and
//! error state to UI collaborators. Also owns filter reconciliation: removal
//! and reset operations followed by exactly one coalesced re-dispatch.
//!
//! ## Input/Output Specification
//! - **Input**: The current filter state plus the free-text query
//! - **Output**: Result list, loading flag, last-error notice (side effects
//!   only; `dispatch` returns nothing to its caller)
//! - **Concurrency**: At most one in-flight search system-wide; overlapping
//!   triggers are dropped, not queued, and never cancel the running search
//!
//! The in-flight and loading flags are released through RAII guards, so no
//! exit path (success, empty, store failure) can leak a stuck flag.

use crate::cache::SearchCache;
use crate::config::SearchConfig;
use crate::errors::Result;
use crate::filters::FilterSet;
use crate::query_parser::{scan_amenities, QueryParser, AMENITIES, PROPERTY_TYPES};
use crate::store::{PropertyStore, QueryCriteria};
use crate::utils::Timer;
use crate::validator::{FilterUniverse, FilterValidator};
use crate::{Property, SortOption};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Duration;

/// Listing type vocabulary
pub const LISTING_TYPES: &[&str] = &["sale", "rent"];

/// The search controller driving one search UI instance
pub struct SearchController {
    config: SearchConfig,
    store: Arc<dyn PropertyStore>,
    filters: Mutex<FilterSet>,
    universe: Mutex<FilterUniverse>,
    parser: Mutex<QueryParser>,
    cache: Mutex<SearchCache>,
    results: Mutex<Vec<Property>>,
    last_error: Mutex<Option<String>>,
    loading: AtomicBool,
    in_flight: AtomicBool,
    pending: Mutex<Option<JoinHandle<()>>>,
}

/// RAII release for an atomic flag
struct FlagGuard<'a>(&'a AtomicBool);

impl<'a> FlagGuard<'a> {
    /// Try to take the flag; `None` when it is already held
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }

    /// Set the flag unconditionally
    fn set(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SearchController {
    /// Create a controller over the given store
    pub fn new(config: SearchConfig, store: Arc<dyn PropertyStore>) -> Result<Self> {
        let cache_ttl_ms = config.cache_ttl_ms;
        Ok(Self {
            config,
            store,
            filters: Mutex::new(FilterSet::default()),
            universe: Mutex::new(FilterUniverse::default()),
            parser: Mutex::new(QueryParser::new()?),
            cache: Mutex::new(SearchCache::new(cache_ttl_ms)),
            results: Mutex::new(Vec::new()),
            last_error: Mutex::new(None),
            loading: AtomicBool::new(false),
            in_flight: AtomicBool::new(false),
            pending: Mutex::new(None),
        })
    }

    /// Discover the session universe from the store: price and living-area
    /// ceilings plus the known-city list. Called once per session.
    pub async fn seed_universe(&self) -> Result<()> {
        let max_price = self.store.max_property_price().await?;
        let max_area = self.store.max_living_area().await?;
        let cities = self.store.all_cities().await?;

        let parser = QueryParser::with_cities(cities.iter().cloned())?;

        {
            let mut universe = self.universe.lock();
            universe.cities = cities.into_iter().collect();
            universe.property_types = PROPERTY_TYPES.iter().map(|t| t.to_string()).collect();
            universe.listing_types = LISTING_TYPES.iter().map(|t| t.to_string()).collect();
            universe.amenities = AMENITIES.iter().map(|a| a.to_string()).collect();
            universe.max_price = max_price;
            universe.max_living_area = max_area;
        }
        *self.parser.lock() = parser;
        self.filters.lock().set_ceilings(max_price, max_area);

        tracing::info!(max_price, max_area, "seeded filter universe");
        Ok(())
    }

    // --- filter state surface ---

    /// Snapshot of the current filter state
    pub fn filters(&self) -> FilterSet {
        self.filters.lock().clone()
    }

    /// Number of non-default optional filter dimensions
    pub fn active_filter_count(&self) -> usize {
        self.filters.lock().active_filter_count()
    }

    /// Set the free-text query, merging validated extraction into the state
    pub fn apply_free_text(&self, query: &str) {
        let extracted = self.parser.lock().parse(query);
        let validated = FilterValidator::validate(&extracted, &self.universe.lock());
        let mut filters = self.filters.lock();
        filters.free_text = query.to_string();
        filters.apply_extracted(&validated);
    }

    /// Replace the city scope
    pub fn set_cities(&self, cities: impl IntoIterator<Item = String>) {
        self.filters.lock().cities = cities.into_iter().collect();
    }

    /// Add one city to the scope
    pub fn add_city(&self, city: &str) {
        self.filters.lock().cities.insert(city.to_string());
    }

    /// Replace the property type restriction
    pub fn set_property_types(&self, types: impl IntoIterator<Item = String>) {
        self.filters.lock().property_types = types.into_iter().collect();
    }

    /// Replace the listing type restriction
    pub fn set_listing_types(&self, types: impl IntoIterator<Item = String>) {
        self.filters.lock().listing_types = types.into_iter().collect();
    }

    /// Set the inclusive price range, clamped to `[0, ceiling]`
    pub fn set_price_range(&self, min: u64, max: u64) {
        let mut filters = self.filters.lock();
        let ceiling = filters.price_ceiling;
        filters.min_price = min.min(ceiling);
        filters.max_price = max.min(ceiling).max(filters.min_price);
    }

    /// Set the bedroom lower bound
    pub fn set_min_beds(&self, beds: u32) {
        self.filters.lock().min_beds = beds;
    }

    /// Set the bathroom lower bound
    pub fn set_min_baths(&self, baths: u32) {
        self.filters.lock().min_baths = baths;
    }

    /// Set the inclusive living-area range, clamped to `[0, ceiling]`
    pub fn set_living_area_range(&self, min: u64, max: u64) {
        let mut filters = self.filters.lock();
        let ceiling = filters.area_ceiling;
        filters.min_living_area = min.min(ceiling);
        filters.max_living_area = max.min(ceiling).max(filters.min_living_area);
    }

    /// Replace the amenity selection
    pub fn set_amenities(&self, amenities: impl IntoIterator<Item = String>) {
        self.filters.lock().amenities = amenities.into_iter().collect();
    }

    /// Set the result ordering
    pub fn set_sort(&self, sort: SortOption) {
        self.filters.lock().sort = sort;
    }

    // --- result surface ---

    /// Current visible result list
    pub fn results(&self) -> Vec<Property> {
        self.results.lock().clone()
    }

    /// Whether a store query is currently loading
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// One-line failure notice from the last dispatch, if any
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    // --- dispatch ---

    /// Run one end-to-end search. Side effects are the only signal: results,
    /// loading, and error state are updated; nothing is returned.
    ///
    /// A call arriving while another dispatch is in flight is dropped
    /// silently. An empty city scope short-circuits to an empty result set
    /// without querying the store.
    pub async fn dispatch(&self) {
        let Some(_in_flight) = FlagGuard::acquire(&self.in_flight) else {
            tracing::debug!("search already in flight, dropping dispatch");
            return;
        };

        let filters = self.filters.lock().clone();

        if filters.cities.is_empty() {
            tracing::debug!("no city selected, short-circuiting to empty results");
            self.results.lock().clear();
            *self.last_error.lock() = None;
            return;
        }

        let effective_text = effective_free_text(&filters.free_text, self.config.min_free_text_len);
        let feature_hints = self.feature_hints(effective_text);
        let merged_amenities = merge_amenities(&filters.amenities, effective_text, feature_hints);
        let params = filters.snapshot(effective_text, merged_amenities);

        let cached = self.cache.lock().lookup(&params);
        if let Some(results) = cached {
            *self.results.lock() = results;
            *self.last_error.lock() = None;
            return;
        }

        let _loading = FlagGuard::set(&self.loading);
        let criteria = QueryCriteria::from_params(&params, self.config.max_results);
        let timer = Timer::new("store_search");

        match self
            .store
            .search_properties(&params.free_text, &criteria)
            .await
        {
            Ok(results) => {
                timer.stop();
                tracing::debug!(count = results.len(), "search succeeded");
                *self.results.lock() = results.clone();
                *self.last_error.lock() = None;
                self.cache.lock().store(results, params);
            }
            Err(e) => {
                tracing::error!(category = e.category(), error = %e, "store query failed");
                // Never show stale results next to an error.
                self.results.lock().clear();
                *self.last_error.lock() = Some(e.user_message());
            }
        }
    }

    /// Validated free-form feature hints ("near the university") re-derived
    /// from the effective free text so they travel with the store request.
    fn feature_hints(&self, effective_text: &str) -> Vec<String> {
        if effective_text.is_empty() {
            return Vec::new();
        }
        let extracted = self.parser.lock().parse(effective_text);
        let validated = FilterValidator::validate(&extracted, &self.universe.lock());
        validated.features.unwrap_or_default()
    }

    /// Manual search trigger: cancels any pending coalesced dispatch and
    /// dispatches immediately.
    pub async fn handle_search(&self) {
        self.cancel_pending();
        self.dispatch().await;
    }

    // --- filter reconciliation ---

    /// Schedule one coalesced follow-up dispatch after a short delay.
    /// Rescheduling cancels the previous timer, so rapid edits collapse
    /// into a single effective search.
    pub fn schedule_dispatch(self: Arc<Self>) {
        let delay = Duration::from_millis(self.config.debounce_ms);
        let controller = Arc::clone(&self);
        let mut pending = self.pending.lock();
        if let Some(handle) = pending.take() {
            handle.abort();
        }
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            controller.dispatch().await;
        }));
    }

    /// Remove one value from a set dimension or reset a scalar/range
    /// dimension, then schedule exactly one follow-up dispatch.
    pub fn remove_filter(self: Arc<Self>, dimension: &str, value: Option<&str>) {
        self.filters.lock().remove_filter(dimension, value);
        self.schedule_dispatch();
    }

    /// Restore every dimension except the city scope to its default, then
    /// schedule exactly one follow-up dispatch.
    pub fn reset(self: Arc<Self>) {
        self.filters.lock().reset_preserving_cities();
        self.schedule_dispatch();
    }

    fn cancel_pending(&self) {
        if let Some(handle) = self.pending.lock().take() {
            handle.abort();
        }
    }
}

/// Free text shorter than the configured minimum (trimmed) carries no
/// search signal.
fn effective_free_text(free_text: &str, min_len: usize) -> &str {
    let trimmed = free_text.trim();
    if trimmed.len() < min_len {
        ""
    } else {
        trimmed
    }
}

/// Union amenity keywords found in the free text, together with any
/// free-form feature hints, into the explicit selection, de-duplicated.
fn merge_amenities(
    explicit: &BTreeSet<String>,
    free_text: &str,
    feature_hints: Vec<String>,
) -> BTreeSet<String> {
    let mut merged = explicit.clone();
    if !free_text.is_empty() {
        merged.extend(scan_amenities(free_text));
    }
    merged.extend(feature_hints);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SearchError;
    use crate::store::MemoryStore;
    use chrono::Utc;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;
    use uuid::Uuid;

    fn listing(city: &str, price: u64) -> Property {
        Property {
            id: Uuid::new_v4(),
            title: format!("Listing in {}", city),
            description: "Sunny place with a garden".to_string(),
            city: city.to_string(),
            property_type: "house".to_string(),
            listing_type: "sale".to_string(),
            price,
            beds: 3,
            baths: 2,
            living_area: 120,
            amenities: vec!["garden".to_string(), "pool".to_string()],
            listed_at: Utc::now(),
        }
    }

    /// Store wrapper counting search invocations, optionally gated on a
    /// notification so a search can be held in flight.
    struct CountingStore {
        inner: MemoryStore,
        calls: AtomicUsize,
        last_criteria: Mutex<Option<QueryCriteria>>,
        gate: Option<Arc<Notify>>,
        fail: bool,
    }

    impl CountingStore {
        fn new(properties: Vec<Property>) -> Self {
            Self {
                inner: MemoryStore::new(properties),
                calls: AtomicUsize::new(0),
                last_criteria: Mutex::new(None),
                gate: None,
                fail: false,
            }
        }

        fn gated(properties: Vec<Property>, gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::new(properties)
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(Vec::new())
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_criteria(&self) -> Option<QueryCriteria> {
            self.last_criteria.lock().clone()
        }
    }

    #[async_trait::async_trait]
    impl PropertyStore for CountingStore {
        async fn search_properties(
            &self,
            free_text: &str,
            criteria: &QueryCriteria,
        ) -> crate::errors::Result<Vec<Property>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_criteria.lock() = Some(criteria.clone());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.fail {
                return Err(SearchError::Query {
                    details: "backend unavailable".to_string(),
                });
            }
            self.inner.search_properties(free_text, criteria).await
        }

        async fn max_property_price(&self) -> crate::errors::Result<u64> {
            self.inner.max_property_price().await
        }

        async fn max_living_area(&self) -> crate::errors::Result<u64> {
            self.inner.max_living_area().await
        }

        async fn all_cities(&self) -> crate::errors::Result<Vec<String>> {
            self.inner.all_cities().await
        }
    }

    fn controller_over(store: Arc<CountingStore>) -> Arc<SearchController> {
        Arc::new(SearchController::new(SearchConfig::default(), store).unwrap())
    }

    async fn wait_for<F: Fn() -> bool>(condition: F) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn empty_city_scope_short_circuits_without_store_call() {
        let store = Arc::new(CountingStore::new(vec![listing("Algiers", 80_000)]));
        let controller = controller_over(store.clone());

        controller.dispatch().await;

        assert_eq!(store.call_count(), 0);
        assert!(controller.results().is_empty());
        assert!(controller.last_error().is_none());
    }

    #[tokio::test]
    async fn dispatch_publishes_results() {
        let store = Arc::new(CountingStore::new(vec![
            listing("Algiers", 80_000),
            listing("Oran", 95_000),
        ]));
        let controller = controller_over(store.clone());
        controller.seed_universe().await.unwrap();
        controller.set_cities(["Algiers".to_string()]);

        controller.dispatch().await;

        assert_eq!(store.call_count(), 1);
        let results = controller.results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].city, "Algiers");
        assert!(!controller.is_loading());
    }

    #[tokio::test]
    async fn repeated_search_within_ttl_hits_the_cache() {
        let store = Arc::new(CountingStore::new(vec![listing("Oran", 95_000)]));
        let controller = controller_over(store.clone());
        controller.seed_universe().await.unwrap();
        controller.set_cities(["Oran".to_string()]);

        controller.dispatch().await;
        controller.dispatch().await;

        assert_eq!(store.call_count(), 1);
        assert_eq!(controller.results().len(), 1);
    }

    #[tokio::test]
    async fn changed_params_bypass_the_cache() {
        let store = Arc::new(CountingStore::new(vec![listing("Oran", 95_000)]));
        let controller = controller_over(store.clone());
        controller.seed_universe().await.unwrap();
        controller.set_cities(["Oran".to_string()]);

        controller.dispatch().await;
        controller.set_min_beds(2);
        controller.dispatch().await;

        assert_eq!(store.call_count(), 2);
    }

    #[tokio::test]
    async fn at_most_one_search_is_in_flight() {
        let gate = Arc::new(Notify::new());
        let store = Arc::new(CountingStore::gated(
            vec![listing("Algiers", 80_000)],
            gate.clone(),
        ));
        let controller = controller_over(store.clone());
        controller.seed_universe().await.unwrap();
        controller.set_cities(["Algiers".to_string()]);

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.dispatch().await })
        };
        wait_for(|| store.call_count() == 1).await;

        // Second dispatch while the first is parked inside the store call.
        controller.dispatch().await;
        assert_eq!(store.call_count(), 1);

        gate.notify_one();
        first.await.unwrap();
        assert_eq!(store.call_count(), 1);
        assert_eq!(controller.results().len(), 1);
    }

    #[tokio::test]
    async fn store_failure_clears_results_and_recovers() {
        let store = Arc::new(CountingStore::failing());
        let controller = controller_over(store.clone());
        controller.set_cities(["Algiers".to_string()]);

        controller.dispatch().await;

        assert!(controller.results().is_empty());
        assert_eq!(
            controller.last_error(),
            Some("Search failed, please try again".to_string())
        );
        assert!(!controller.is_loading());

        // The guard was released; the next dispatch reaches the store again.
        controller.dispatch().await;
        assert_eq!(store.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn remove_filter_triggers_exactly_one_dispatch() {
        let store = Arc::new(CountingStore::new(vec![listing("Algiers", 80_000)]));
        let controller = controller_over(store.clone());
        controller.seed_universe().await.unwrap();
        controller.set_cities(["Algiers".to_string()]);
        controller.set_amenities(["pool".to_string(), "garden".to_string()]);

        controller.clone().remove_filter("amenities", Some("pool"));

        // Advance past the debounce window.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(store.call_count(), 1);
        assert_eq!(
            controller.filters().amenities,
            ["garden".to_string()].into()
        );
        // No further dispatches follow the one scheduled.
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(store.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_edits_coalesce_into_one_dispatch() {
        let store = Arc::new(CountingStore::new(vec![listing("Algiers", 80_000)]));
        let controller = controller_over(store.clone());
        controller.seed_universe().await.unwrap();
        controller.set_cities(["Algiers".to_string()]);
        controller.set_amenities([
            "pool".to_string(),
            "garden".to_string(),
            "garage".to_string(),
        ]);

        controller.clone().remove_filter("amenities", Some("pool"));
        controller.clone().remove_filter("amenities", Some("garden"));
        controller.clone().remove_filter("amenities", Some("garage"));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(store.call_count(), 1);
        assert!(controller.filters().amenities.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_preserves_city_scope() {
        let store = Arc::new(CountingStore::new(vec![listing("Algiers", 80_000)]));
        let controller = controller_over(store.clone());
        controller.seed_universe().await.unwrap();
        controller.set_cities(["Algiers".to_string()]);
        controller.set_min_beds(3);

        controller.clone().reset();

        let filters = controller.filters();
        assert_eq!(filters.cities, ["Algiers".to_string()].into());
        assert_eq!(filters.min_beds, 0);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(store.call_count(), 1);
    }

    #[tokio::test]
    async fn free_text_amenities_are_unioned_into_the_request() {
        let mut only_garden = listing("Algiers", 70_000);
        only_garden.amenities = vec!["garden".to_string()];
        let store = Arc::new(CountingStore::new(vec![
            listing("Algiers", 80_000), // has garden and pool
            only_garden,
        ]));
        let controller = controller_over(store.clone());
        controller.seed_universe().await.unwrap();
        controller.set_cities(["Algiers".to_string()]);
        controller.set_amenities(["garden".to_string()]);
        // Only sets the free text; the amenity scan happens at dispatch time.
        {
            let mut filters = controller.filters.lock();
            filters.free_text = "with pool".to_string();
        }

        controller.dispatch().await;

        let results = controller.results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].price, 80_000);
    }

    #[tokio::test]
    async fn free_text_feature_hints_reach_the_store_request() {
        let store = Arc::new(CountingStore::new(vec![listing("Algiers", 80_000)]));
        let controller = controller_over(store.clone());
        controller.seed_universe().await.unwrap();
        controller.set_cities(["Algiers".to_string()]);
        {
            let mut filters = controller.filters.lock();
            filters.free_text = "house near the university".to_string();
        }

        controller.dispatch().await;

        let criteria = store.last_criteria().unwrap();
        assert!(criteria.features.contains("near the university"));
    }

    #[tokio::test]
    async fn short_free_text_carries_no_signal() {
        let store = Arc::new(CountingStore::new(vec![listing("Algiers", 80_000)]));
        let controller = controller_over(store.clone());
        controller.seed_universe().await.unwrap();
        controller.set_cities(["Algiers".to_string()]);
        {
            let mut filters = controller.filters.lock();
            filters.free_text = "zx".to_string();
        }

        controller.dispatch().await;

        // "zx" matches nothing, but it is below the signal threshold and is
        // ignored rather than filtering everything out.
        assert_eq!(controller.results().len(), 1);
    }

    #[tokio::test]
    async fn seeded_universe_drives_free_text_city_extraction() {
        let store = Arc::new(CountingStore::new(vec![listing("Ghardaia", 60_000)]));
        let controller = controller_over(store.clone());
        controller.seed_universe().await.unwrap();

        controller.apply_free_text("house in ghardaia");

        let filters = controller.filters();
        assert_eq!(filters.cities, ["Ghardaia".to_string()].into());
        assert_eq!(filters.property_types, ["house".to_string()].into());
    }

    #[tokio::test]
    async fn city_edits_never_change_active_filter_count() {
        let store = Arc::new(CountingStore::new(vec![listing("Algiers", 80_000)]));
        let controller = controller_over(store);

        let before = controller.active_filter_count();
        controller.set_cities(["Algiers".to_string(), "Oran".to_string()]);
        assert_eq!(controller.active_filter_count(), before);
    }
}
