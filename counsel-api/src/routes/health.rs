//! Health Check Routes
//!
//! Liveness/readiness endpoints for deployment probes. No authentication.

use axum::{extract::State, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

/// Health status report.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Seconds since server start
    pub uptime_secs: u64,
}

/// GET /health - Service health report
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health(State(start_time): State<std::time::Instant>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: start_time.elapsed().as_secs(),
    })
}

/// Create the health routes router.
pub fn create_router(state: crate::state::AppState) -> axum::Router {
    axum::Router::new()
        .route("/health", axum::routing::get(health))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use counsel_storage::MemoryStorage;
    use std::sync::Arc;
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_reports_ok() {
        let (state, _rx) = AppState::for_tests(Arc::new(MemoryStorage::new()));
        let app = create_router(state);
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let health: HealthResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(health.status, "ok");
    }
}
