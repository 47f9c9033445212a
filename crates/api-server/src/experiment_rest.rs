//! User-facing A/B assignment endpoint.

use crate::auth::AuthUser;
use crate::rest::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use market_management::{ApiError, Assignment};

/// GET /ab-testing/assignment — The caller's variant in the running test.
#[utoipa::path(
    get,
    path = "/ab-testing/assignment",
    tag = "A/B Testing",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Variant and its configuration", body = Assignment),
        (status = 204, description = "No active test"),
        (status = 401, description = "Missing or invalid token"),
    )
)]
pub async fn get_assignment(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, ApiError> {
    Ok(match state.ab_testing.assignment(&user.user_id)? {
        Some(assignment) => Json(assignment).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}
