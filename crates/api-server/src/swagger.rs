//! OpenAPI specification and Swagger UI configuration.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Marketplace Personalization API",
        version = "0.1.0",
        description = "Personalized listing recommendations and A/B testing for a rental marketplace.",
        license(name = "MIT"),
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Recommendations", description = "Personalized ranking and interaction tracking"),
        (name = "A/B Testing", description = "Experiment assignment, tracking and reports"),
        (name = "Operations", description = "Health, readiness, and liveness probes"),
    ),
    paths(
        // Recommendations
        crate::recommendations_rest::get_recommendations,
        crate::recommendations_rest::track_interaction,
        // A/B testing
        crate::experiment_rest::get_assignment,
        market_management::handlers::create_test,
        market_management::handlers::list_tests,
        market_management::handlers::activate_test,
        market_management::handlers::deactivate_test,
        market_management::handlers::track_metric,
        market_management::handlers::test_results,
        // Operations
        crate::rest::health_check,
        crate::rest::readiness,
        crate::rest::liveness,
    ),
    components(schemas(
        // Domain types
        market_core::types::Listing,
        market_core::types::InteractionType,
        market_core::types::Experiment,
        market_core::types::ExperimentMetrics,
        market_core::types::VariantMetrics,
        market_core::types::Variant,
        market_core::experimentation::ExperimentReport,
        market_core::experimentation::VariantReports,
        market_core::experimentation::VariantReport,
        // Request / response types
        crate::recommendations_rest::TrackInteractionRequest,
        crate::recommendations_rest::TrackInteractionResponse,
        market_management::models::CreateTestRequest,
        market_management::models::Assignment,
        market_management::models::TrackResponse,
        market_management::models::ErrorResponse,
        crate::rest::HealthResponse,
    ))
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}
