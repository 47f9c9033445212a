//! Admin API request/response types and the HTTP error mapping.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use market_core::types::Variant;
use market_core::MarketError;
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

// ─── A/B tests ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateTestRequest {
    pub name: String,
    #[serde(default = "empty_object")]
    pub variant_a: serde_json::Value,
    #[serde(default = "empty_object")]
    pub variant_b: serde_json::Value,
    /// Percentage of users (0-100) bucketed into variant A.
    #[serde(default = "default_traffic_split")]
    pub traffic_split: u8,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}
fn default_traffic_split() -> u8 {
    50
}
fn default_active() -> bool {
    true
}

/// A user's bucket in the currently running experiment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Assignment {
    pub experiment_id: Uuid,
    pub name: String,
    pub variant: Variant,
    pub config: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TrackResponse {
    pub success: bool,
}

// ─── Errors ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// `MarketError` rendered as a JSON error response.
#[derive(Debug)]
pub struct ApiError(pub MarketError);

impl From<MarketError> for ApiError {
    fn from(err: MarketError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(MarketError::Validation(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(MarketError::Validation(rejection.body_text()))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            MarketError::NotFound(_) => StatusCode::NOT_FOUND,
            MarketError::Validation(_) => StatusCode::BAD_REQUEST,
            MarketError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }
        metrics::counter!("api.errors", "code" => self.0.code()).increment(1);
        (
            status,
            Json(ErrorResponse {
                error: self.0.code().to_string(),
                message: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_defaults() {
        let req: CreateTestRequest =
            serde_json::from_value(serde_json::json!({ "name": "cta" })).unwrap();
        assert_eq!(req.traffic_split, 50);
        assert!(req.is_active);
        assert!(req.variant_a.as_object().unwrap().is_empty());
    }

    #[test]
    fn test_error_status_mapping() {
        let status = |e: MarketError| ApiError(e).status();
        assert_eq!(status(MarketError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(MarketError::Validation("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(MarketError::Unavailable("x".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status(MarketError::Config("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
