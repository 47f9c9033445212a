#![warn(clippy::unwrap_used)]

pub mod auth;
pub mod experiment_rest;
pub mod recommendations_rest;
pub mod rest;
pub mod server;
pub mod swagger;

pub use auth::{AuthUser, TokenAuthority};
pub use rest::AppState;
pub use server::{build_router, ApiServer};
pub use swagger::ApiDoc;
