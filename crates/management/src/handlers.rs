//! Axum REST handlers for the A/B testing admin API.

use crate::ab_testing::AbTestingService;
use crate::models::*;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use market_core::experimentation::ExperimentReport;
use market_core::types::{Experiment, Metric, Variant};
use std::sync::Arc;
use uuid::Uuid;

/// Shared admin state.
#[derive(Clone)]
pub struct ManagementState {
    pub ab_testing: Arc<AbTestingService>,
}

// ─── Lifecycle ─────────────────────────────────────────────────────────────

#[utoipa::path(
    post,
    path = "/admin/ab-testing",
    tag = "A/B Testing",
    request_body = CreateTestRequest,
    responses(
        (status = 201, description = "Test created", body = Experiment),
        (status = 400, description = "Invalid name or traffic split", body = ErrorResponse),
    )
)]
pub async fn create_test(
    State(state): State<ManagementState>,
    body: Result<Json<CreateTestRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Experiment>), ApiError> {
    let Json(req) = body?;
    let experiment = state.ab_testing.create_test(req)?;
    metrics::counter!("management.ab_tests.created").increment(1);
    Ok((StatusCode::CREATED, Json(experiment)))
}

#[utoipa::path(
    get,
    path = "/admin/ab-testing",
    tag = "A/B Testing",
    responses(
        (status = 200, description = "All tests, newest first", body = [Experiment]),
    )
)]
pub async fn list_tests(
    State(state): State<ManagementState>,
) -> Result<Json<Vec<Experiment>>, ApiError> {
    Ok(Json(state.ab_testing.list_tests()?))
}

#[utoipa::path(
    post,
    path = "/admin/ab-testing/{id}/activate",
    tag = "A/B Testing",
    params(("id" = Uuid, Path, description = "Experiment id")),
    responses(
        (status = 200, description = "Test activated", body = Experiment),
        (status = 404, description = "Unknown test", body = ErrorResponse),
    )
)]
pub async fn activate_test(
    State(state): State<ManagementState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Experiment>, ApiError> {
    let Path(id) = path?;
    Ok(Json(state.ab_testing.set_active(&id, true)?))
}

#[utoipa::path(
    post,
    path = "/admin/ab-testing/{id}/deactivate",
    tag = "A/B Testing",
    params(("id" = Uuid, Path, description = "Experiment id")),
    responses(
        (status = 200, description = "Test deactivated", body = Experiment),
        (status = 404, description = "Unknown test", body = ErrorResponse),
    )
)]
pub async fn deactivate_test(
    State(state): State<ManagementState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Experiment>, ApiError> {
    let Path(id) = path?;
    Ok(Json(state.ab_testing.set_active(&id, false)?))
}

// ─── Tracking & reporting ──────────────────────────────────────────────────

#[utoipa::path(
    post,
    path = "/admin/ab-testing/{id}/track/{variant}/{metric}",
    tag = "A/B Testing",
    params(
        ("id" = Uuid, Path, description = "Experiment id"),
        ("variant" = String, Path, description = "A or B"),
        ("metric" = String, Path, description = "views, clicks or conversions"),
    ),
    responses(
        (status = 200, description = "Counter incremented", body = TrackResponse),
        (status = 400, description = "Unknown variant or metric", body = ErrorResponse),
        (status = 404, description = "Unknown or inactive test", body = ErrorResponse),
    )
)]
pub async fn track_metric(
    State(state): State<ManagementState>,
    path: Result<Path<(Uuid, String, String)>, PathRejection>,
) -> Result<Json<TrackResponse>, ApiError> {
    let Path((id, variant, metric)) = path?;
    let variant: Variant = variant.parse()?;
    let metric: Metric = metric.parse()?;
    state.ab_testing.track(&id, variant, metric)?;
    Ok(Json(TrackResponse { success: true }))
}

#[utoipa::path(
    get,
    path = "/admin/ab-testing/{id}/results",
    tag = "A/B Testing",
    params(("id" = Uuid, Path, description = "Experiment id")),
    responses(
        (status = 200, description = "Per-variant counters and rates", body = ExperimentReport),
        (status = 404, description = "Unknown test", body = ErrorResponse),
    )
)]
pub async fn test_results(
    State(state): State<ManagementState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ExperimentReport>, ApiError> {
    let Path(id) = path?;
    Ok(Json(state.ab_testing.results(&id)?))
}
