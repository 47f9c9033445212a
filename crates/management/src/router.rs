//! Admin router — mounts the A/B testing endpoints under /admin/ab-testing.

use crate::ab_testing::AbTestingService;
use crate::handlers::{self, ManagementState};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

/// Build the admin router. Authorization is layered on by the caller.
pub fn management_router(ab_testing: Arc<AbTestingService>) -> Router {
    let state = ManagementState { ab_testing };

    Router::new()
        .route("/admin/ab-testing", get(handlers::list_tests).post(handlers::create_test))
        .route("/admin/ab-testing/:id/activate", post(handlers::activate_test))
        .route("/admin/ab-testing/:id/deactivate", post(handlers::deactivate_test))
        .route(
            "/admin/ab-testing/:id/track/:variant/:metric",
            post(handlers::track_metric),
        )
        .route("/admin/ab-testing/:id/results", get(handlers::test_results))
        .with_state(state)
}
