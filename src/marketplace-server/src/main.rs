//! Marketplace personalization server.
//!
//! Main entry point that wires the stores, recommendation engine and A/B
//! testing service together and starts the HTTP and metrics servers.

use clap::Parser;
use market_api::ApiServer;
use market_core::config::AppConfig;
use market_management::{AbTestingService, InMemoryExperimentStore};
use market_personalization::{
    FallbackRanker, InMemoryCatalog, InMemoryInteractionLog, PopularCache, RecommendationEngine,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

#[derive(Parser, Debug)]
#[command(name = "marketplace-server")]
#[command(about = "Personalized listing recommendations and A/B testing for a rental marketplace")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "MARKETPLACE__NODE_ID")]
    node_id: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "MARKETPLACE__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Prometheus exporter port (overrides config)
    #[arg(long, env = "MARKETPLACE__METRICS__PORT")]
    metrics_port: Option<u16>,

    /// Load a small demo catalog at startup
    #[arg(long, default_value_t = false)]
    seed_demo: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "marketplace_server=info,market_api=info,tower_http=info".into()
            }),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("Marketplace server starting up");

    // Load configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(port) = cli.metrics_port {
        config.metrics.port = port;
    }

    let rec = &config.recommendations;
    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        metrics_port = config.metrics.port,
        fallback_policy = ?rec.fallback_policy,
        popular_cache_ttl_secs = rec.popular_cache_ttl_secs,
        "Configuration loaded"
    );

    // Stores
    let catalog = Arc::new(InMemoryCatalog::new());
    if cli.seed_demo {
        catalog.seed_demo_data();
        info!(listings = catalog.len(), "Demo catalog loaded");
    }
    let interactions = Arc::new(InMemoryInteractionLog::new());

    // Popular-list cache (disabled when the TTL is zero)
    let popular_cache = (rec.popular_cache_ttl_secs > 0).then(|| {
        Arc::new(PopularCache::new(
            "popular_listings",
            Duration::from_secs(rec.popular_cache_ttl_secs),
            rec.popular_cache_size.max(1),
        ))
    });

    let mut fallback = FallbackRanker::new(catalog.clone(), interactions.clone(), rec);
    if let Some(cache) = &popular_cache {
        fallback = fallback.with_cache(cache.clone());
    }
    let engine = Arc::new(
        RecommendationEngine::new(catalog.clone(), interactions.clone(), rec)
            .with_fallback(fallback),
    );

    let ab_testing = Arc::new(AbTestingService::new(Arc::new(
        InMemoryExperimentStore::new(),
    )));

    let api_server = ApiServer::new(config.clone(), engine, ab_testing);

    // Start metrics exporter
    if let Err(e) = api_server.start_metrics().await {
        error!(error = %e, "Failed to start metrics exporter");
    }

    // Spawn cache maintenance task
    if let Some(cache) = popular_cache.clone() {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                let evicted = cache.evict_expired();
                debug!(evicted, "Popular cache maintenance");
            }
        });
    }

    info!("Marketplace server is ready to serve traffic");

    // Start HTTP server (blocks until shutdown)
    api_server.start_http().await?;

    if let Some(cache) = popular_cache {
        cache.clear();
    }
    info!("Marketplace server shut down");

    Ok(())
}
