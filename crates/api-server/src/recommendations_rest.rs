//! Recommendation endpoints.

use crate::auth::AuthUser;
use crate::rest::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use market_core::types::{InteractionType, Listing};
use market_management::ApiError;
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecommendationQuery {
    /// Number of listings, clamped to the configured maximum.
    pub limit: Option<usize>,
}

/// GET /recommendations — Ranked listings for the caller.
#[utoipa::path(
    get,
    path = "/recommendations",
    tag = "Recommendations",
    params(RecommendationQuery),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Listings, best match first", body = [Listing]),
        (status = 401, description = "Missing or invalid token"),
    )
)]
pub async fn get_recommendations(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<RecommendationQuery>,
) -> Result<Json<Vec<Listing>>, ApiError> {
    let response = state.engine.recommend(&user.user_id, query.limit)?;
    Ok(Json(response.listings()))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TrackInteractionRequest {
    pub listing_id: Uuid,
    #[serde(rename = "type")]
    pub interaction_type: InteractionType,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TrackInteractionResponse {
    pub recorded: bool,
}

/// POST /recommendations/track — Record a user interaction.
///
/// Tracking is best-effort: lookup and storage failures are logged and
/// reported as `recorded: false`, never as an error status.
#[utoipa::path(
    post,
    path = "/recommendations/track",
    tag = "Recommendations",
    request_body = TrackInteractionRequest,
    security(("bearer" = [])),
    responses(
        (status = 202, description = "Interaction accepted", body = TrackInteractionResponse),
        (status = 400, description = "Malformed body or unknown interaction type"),
        (status = 401, description = "Missing or invalid token"),
    )
)]
pub async fn track_interaction(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<TrackInteractionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TrackInteractionResponse>), ApiError> {
    let Json(req) = body?;

    let recorded = match state.engine.record_interaction(
        &user.user_id,
        req.listing_id,
        req.interaction_type,
        req.metadata,
    ) {
        Ok(_) => true,
        Err(e) => {
            warn!(
                user_id = %user.user_id,
                listing_id = %req.listing_id,
                error = %e,
                "Interaction not recorded"
            );
            false
        }
    };
    Ok((StatusCode::ACCEPTED, Json(TrackInteractionResponse { recorded })))
}
