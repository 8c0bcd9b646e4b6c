//! Counselbase API - REST API Layer
//!
//! This crate provides the HTTP surface of the Counselbase counselling
//! management backend. It exposes REST endpoints (Axum) for accounts,
//! students, counsellors, assignment slots, and counselling sessions,
//! plus a background autosave job for session drafts.
//!
//! The API layer is storage-agnostic: handlers talk to the `Storage`
//! trait from `counsel-storage`, which owns the assignment-slot
//! capacity invariants.

pub mod auth;
pub mod config;
pub mod error;
pub mod jobs;
pub mod macros;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod services;
pub mod state;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use auth::{
    authenticate, generate_jwt_token, validate_jwt_token, AuthConfig, AuthContext, AuthMethod,
    Claims, JwtClock, JwtSecret, SystemClock,
};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use jobs::{autosave_task, AutosaveMetrics, AutosaveRequest};
pub use middleware::{auth_middleware, AuthExtractor, AuthMiddlewareState, RateLimitState};
pub use openapi::ApiDoc;
pub use routes::{create_api_router, SecureRouterBuilder};
pub use state::AppState;
pub use types::*;
pub use validation::{HasUpdates, ValidateNonEmpty, ValidateRange};
