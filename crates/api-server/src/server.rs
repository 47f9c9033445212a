//! API server — HTTP REST endpoints plus the Prometheus exporter.

use crate::auth::{require_admin, TokenAuthority};
use crate::rest::{self, AppState};
use crate::swagger::ApiDoc;
use crate::{experiment_rest, recommendations_rest};
use axum::routing::{get, post};
use axum::{middleware, Router};
use market_core::config::AppConfig;
use market_management::{management_router, AbTestingService};
use market_personalization::RecommendationEngine;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Assemble the full HTTP application: public, authenticated and admin routes.
pub fn build_router(state: AppState) -> Router {
    let admin = management_router(state.ab_testing.clone()).route_layer(
        middleware::from_fn_with_state(state.auth.clone(), require_admin),
    );

    Router::new()
        // Personalization
        .route("/recommendations", get(recommendations_rest::get_recommendations))
        .route(
            "/recommendations/track",
            post(recommendations_rest::track_interaction),
        )
        .route("/ab-testing/assignment", get(experiment_rest::get_assignment))
        // Operational endpoints
        .route("/health", get(rest::health_check))
        .route("/ready", get(rest::readiness))
        .route("/live", get(rest::liveness))
        .with_state(state)
        .merge(admin)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Main API server.
pub struct ApiServer {
    config: AppConfig,
    engine: Arc<RecommendationEngine>,
    ab_testing: Arc<AbTestingService>,
}

impl ApiServer {
    pub fn new(
        config: AppConfig,
        engine: Arc<RecommendationEngine>,
        ab_testing: Arc<AbTestingService>,
    ) -> Self {
        Self {
            config,
            engine,
            ab_testing,
        }
    }

    fn state(&self) -> AppState {
        AppState {
            engine: self.engine.clone(),
            ab_testing: self.ab_testing.clone(),
            auth: Arc::new(TokenAuthority::new(&self.config.auth)),
            node_id: self.config.node_id.clone(),
            start_time: Instant::now(),
        }
    }

    /// Start the HTTP REST server.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let app = build_router(self.state());

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }

    /// Start the metrics server on a separate port.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
        let handle = builder
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install_recorder()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");

        // Keep the handle alive
        std::mem::forget(handle);
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
