//! # Listing Search Driver
//!
//! ## Purpose
//! Command-line entry point for the listing search core: loads configuration,
//! connects a property store backend, seeds the filter universe, and runs one
//! search from the command line.
//!
//! ## Architecture Flow
//! 1. Parse command line arguments and load configuration
//! 2. Initialize logging and tracing
//! 3. Connect the configured store backend (memory file or REST endpoint)
//! 4. Seed the session universe (ceilings, known cities)
//! 5. Apply the city scope and free-text query, dispatch, print results

use anyhow::Context;
use clap::{Arg, ArgAction, Command};
use std::sync::Arc;
use tracing::info;

use listing_search::{
    config::{Config, LoggingConfig},
    utils::TextUtils,
    MemoryStore, PropertyStore, RestStore, SearchController,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = Command::new("listing-search")
        .version("0.1.0")
        .about("Search and filter core for a real-estate listing application")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("data")
                .short('d')
                .long("data")
                .value_name("FILE")
                .help("JSON listings file (overrides the configured memory-store data path)"),
        )
        .arg(
            Arg::new("city")
                .long("city")
                .value_name("CITY")
                .help("City scope (repeatable); searches require at least one")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("query")
                .value_name("QUERY")
                .help("Free-text search query")
                .default_value(""),
        )
        .get_matches();

    let config_path = matches
        .get_one::<String>("config")
        .expect("config has a default value");
    let mut config = Config::from_file(config_path)?;

    if let Some(data) = matches.get_one::<String>("data") {
        config.store.backend = "memory".to_string();
        config.store.data_path = Some(data.clone());
    }

    init_logging(&config.logging);
    info!("Starting listing search, configuration from {}", config_path);

    let store = build_store(&config)?;
    let controller = Arc::new(SearchController::new(config.search.clone(), store)?);

    controller
        .seed_universe()
        .await
        .context("failed to seed the filter universe from the store")?;

    let cities: Vec<String> = matches
        .get_many::<String>("city")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    controller.set_cities(cities);

    let query = matches
        .get_one::<String>("query")
        .expect("query has a default value");
    if !query.is_empty() {
        controller.apply_free_text(query);
    }

    controller.handle_search().await;

    if let Some(notice) = controller.last_error() {
        eprintln!("{}", notice);
        std::process::exit(1);
    }

    let results = controller.results();
    let filters = controller.filters();
    if filters.cities.is_empty() {
        println!("No city selected; pass at least one --city to search.");
        return Ok(());
    }

    println!(
        "{} result(s), {} active filter(s)",
        results.len(),
        controller.active_filter_count()
    );
    for property in &results {
        println!(
            "  {} — {} {} in {}, {} DZD, {} bd / {} ba, {} m²",
            TextUtils::truncate(&property.title, 48),
            property.property_type,
            property.listing_type,
            property.city,
            property.price,
            property.beds,
            property.baths,
            property.living_area
        );
    }

    Ok(())
}

/// Initialize logging and tracing
fn init_logging(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Build the configured property store backend
fn build_store(config: &Config) -> anyhow::Result<Arc<dyn PropertyStore>> {
    match config.store.backend.as_str() {
        "memory" => {
            let store = match &config.store.data_path {
                Some(path) => MemoryStore::from_json_file(path)
                    .with_context(|| format!("failed to load listings from {}", path))?,
                None => MemoryStore::new(Vec::new()),
            };
            Ok(Arc::new(store))
        }
        "rest" => Ok(Arc::new(RestStore::new(&config.store)?)),
        other => anyhow::bail!("unknown store backend '{}'", other),
    }
}
