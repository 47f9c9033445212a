//! Experiment management — A/B test persistence, bucketing, metric tracking
//! and the admin REST API.
//!
//! Data stored in DashMap (development); swap the `ExperimentStore` for a
//! relational backend in production.

#![warn(clippy::unwrap_used)]

pub mod ab_testing;
pub mod handlers;
pub mod models;
pub mod router;
pub mod store;

pub use ab_testing::AbTestingService;
pub use handlers::ManagementState;
pub use models::{ApiError, Assignment, ErrorResponse};
pub use router::management_router;
pub use store::{ExperimentStore, InMemoryExperimentStore};
