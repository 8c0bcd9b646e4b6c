//! REST API Routes Module
//!
//! This module contains all REST API route handlers organized by entity
//! type, plus the secure router builder that assembles them behind the
//! auth, rate-limiting, and CORS layers.

pub mod assignment;
pub mod auth;
pub mod counsellor;
pub mod health;
pub mod session;
pub mod student;

use std::time::Duration;

use axum::{
    http::{header, header::HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{
    auth_middleware, rate_limit_middleware, AuthMiddlewareState, RateLimitState,
};
use crate::openapi::ApiDoc;
use crate::state::AppState;

// ============================================================================
// OPENAPI ENDPOINT
// ============================================================================

/// Handler for /openapi.json endpoint.
async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

// ============================================================================
// PRODUCTION VALIDATION
// ============================================================================

/// Check if running in a production environment.
fn is_production_environment() -> bool {
    std::env::var("COUNSEL_ENVIRONMENT")
        .map(|e| matches!(e.to_lowercase().as_str(), "production" | "prod"))
        .unwrap_or(false)
}

/// Validate API configuration for production use.
fn validate_api_config_for_production(config: &ApiConfig) -> ApiResult<()> {
    if config.cors_origins.is_empty() {
        return Err(ApiError::invalid_input(
            "CORS origins not configured for production. Set COUNSEL_CORS_ORIGINS.",
        ));
    }
    if !config.rate_limit_enabled {
        tracing::warn!(
            "Rate limiting is disabled in production - this is not recommended.\n\
             Set COUNSEL_RATE_LIMIT_ENABLED=true to enable rate limiting."
        );
    }
    Ok(())
}

// ============================================================================
// SECURE ROUTER BUILDER
// ============================================================================

/// Builder for the API router with auth + rate limiting by default.
///
/// All /api/v1/* routes require authentication except the login route.
/// Health and the OpenAPI document are public but still rate-limited.
pub struct SecureRouterBuilder {
    state: AppState,
    auth_state: AuthMiddlewareState,
    rate_limit_state: RateLimitState,
}

impl SecureRouterBuilder {
    /// Create a new SecureRouterBuilder.
    ///
    /// In production environments, this validates that security
    /// configurations are properly set up and returns an error if critical
    /// settings are missing.
    pub fn new(state: AppState) -> ApiResult<Self> {
        if is_production_environment() {
            state.auth_config.validate_for_production()?;
            validate_api_config_for_production(&state.api_config)?;
        }

        let auth_state = AuthMiddlewareState::new(state.auth_config.clone());
        let rate_limit_state = RateLimitState::new(state.api_config.clone());

        Ok(Self {
            state,
            auth_state,
            rate_limit_state,
        })
    }

    /// Build the /api/v1 routes. Login is public; everything else sits
    /// behind the auth middleware.
    ///
    /// The rate limiter is layered under auth on protected routes, so it
    /// keys authenticated traffic by account. Login is limited by IP.
    fn build_entity_routes(&self) -> Router {
        let state = self.state.clone();
        let auth_layer = from_fn_with_state(self.auth_state.clone(), auth_middleware);
        let rate_limit_layer =
            from_fn_with_state(self.rate_limit_state.clone(), rate_limit_middleware);

        let auth_routes = auth::create_public_router(state.clone())
            .layer(rate_limit_layer.clone())
            .merge(
                auth::create_router(state.clone())
                    .layer(rate_limit_layer.clone())
                    .layer(auth_layer.clone()),
            );

        Router::new()
            .nest("/auth", auth_routes)
            .nest(
                "/students",
                student::create_router(state.clone())
                    .layer(rate_limit_layer.clone())
                    .layer(auth_layer.clone()),
            )
            .nest(
                "/counsellors",
                counsellor::create_router(state.clone())
                    .layer(rate_limit_layer.clone())
                    .layer(auth_layer.clone()),
            )
            .nest(
                "/assignments",
                assignment::create_router(state.clone())
                    .layer(rate_limit_layer.clone())
                    .layer(auth_layer.clone()),
            )
            .nest(
                "/sessions",
                session::create_router(state)
                    .layer(rate_limit_layer)
                    .layer(auth_layer),
            )
    }

    /// Build the complete router with the full security stack.
    ///
    /// # Middleware Order (outer to inner)
    /// 1. CORS (outermost) - handles preflight requests
    /// 2. Trace - request/response logging
    /// 3. Auth (protected routes) - validates credentials
    /// 4. Rate Limiting (innermost) - account-keyed once auth has run,
    ///    IP-keyed on the public routes
    pub fn build(self) -> ApiResult<Router> {
        let api_routes = self.build_entity_routes();

        // Health, the OpenAPI document, and Swagger are public but still
        // rate-limited by client IP.
        let mut public = Router::new()
            .merge(health::create_router(self.state.clone()))
            .route("/openapi.json", get(openapi_json));

        #[cfg(feature = "swagger-ui")]
        {
            use utoipa_swagger_ui::SwaggerUi;
            public = public
                .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));
        }

        public = public.layer(from_fn_with_state(
            self.rate_limit_state,
            rate_limit_middleware,
        ));

        let cors = build_cors_layer(&self.state.api_config);

        Ok(Router::new()
            .nest("/api/v1", api_routes)
            .merge(public)
            .layer(TraceLayer::new_for_http())
            .layer(cors))
    }
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// In development mode (empty origins), allows all origins.
/// In production mode, only allows configured origins.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static("x-api-key"),
        ])
        .expose_headers([
            HeaderName::from_static("x-ratelimit-limit"),
            HeaderName::from_static("retry-after"),
        ])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        // Development mode: allow all origins
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any).allow_headers(Any).expose_headers(Any)
    } else {
        // Production mode: only allow configured origins
        tracing::info!(
            "CORS: Production mode - allowing origins: {:?}",
            config.cors_origins
        );
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        if config.cors_allow_credentials {
            cors.allow_origin(origins).allow_credentials(true)
        } else {
            cors.allow_origin(origins)
        }
    }
}

/// Create the complete API router with all routes, authentication, and
/// rate limiting.
pub fn create_api_router(state: AppState) -> ApiResult<Router> {
    SecureRouterBuilder::new(state).and_then(|builder| builder.build())
}
