//! Axum Middleware for Authentication and Rate Limiting
//!
//! This module provides Axum middleware that:
//! - Authenticates requests using API keys or JWT tokens
//! - Injects AuthContext into request extensions
//! - Returns 401 for unauthenticated requests
//! - Enforces per-client rate limits with 429 responses

use crate::auth::{authenticate, AuthConfig, AuthContext};
use crate::config::ApiConfig;
use crate::error::ApiError;
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{clock::DefaultClock, state::keyed::DefaultKeyedStateStore, Quota, RateLimiter};
use std::net::IpAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

// ============================================================================
// AUTH MIDDLEWARE
// ============================================================================

/// Shared state for authentication middleware.
#[derive(Debug, Clone)]
pub struct AuthMiddlewareState {
    /// Authentication configuration
    pub auth_config: Arc<AuthConfig>,
}

impl AuthMiddlewareState {
    /// Create new middleware state with the given auth configuration.
    pub fn new(auth_config: AuthConfig) -> Self {
        Self {
            auth_config: Arc::new(auth_config),
        }
    }
}

/// Axum middleware for authentication.
///
/// Extracts the X-API-Key or Authorization: Bearer header, validates it, and
/// injects an [`AuthContext`] into request extensions on success.
///
/// # Example
///
/// ```ignore
/// use axum::{Router, middleware};
/// use counsel_api::middleware::{auth_middleware, AuthMiddlewareState};
/// use counsel_api::AuthConfig;
///
/// let auth_state = AuthMiddlewareState::new(AuthConfig::from_env());
///
/// let app = Router::new()
///     .route("/api/v1/students", axum::routing::get(|| async { "OK" }))
///     .layer(middleware::from_fn_with_state(auth_state.clone(), auth_middleware));
/// ```
pub async fn auth_middleware(
    State(state): State<AuthMiddlewareState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthMiddlewareError> {
    let api_key_header = request
        .headers()
        .get("x-api-key")
        .and_then(|h| h.to_str().ok());

    let bearer_token = request
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let auth_context = authenticate(api_key_header, bearer_token, &state.auth_config)
        .map_err(AuthMiddlewareError)?;

    request.extensions_mut().insert(auth_context);

    Ok(next.run(request).await)
}

/// Error wrapper for middleware that implements IntoResponse.
#[derive(Debug)]
pub struct AuthMiddlewareError(pub ApiError);

impl IntoResponse for AuthMiddlewareError {
    fn into_response(self) -> Response {
        self.0.into_response()
    }
}

// ============================================================================
// TYPED EXTRACTOR
// ============================================================================

/// Typed Axum extractor for authentication context.
///
/// Usable directly in handler signatures once `auth_middleware` is applied to
/// the route. Without the middleware, extraction fails with a 500 since the
/// context was never injected.
#[derive(Debug, Clone)]
pub struct AuthExtractor(pub AuthContext);

#[async_trait]
impl<S> FromRequestParts<S> for AuthExtractor
where
    S: Send + Sync,
{
    type Rejection = AuthMiddlewareError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(AuthExtractor)
            .ok_or_else(|| {
                AuthMiddlewareError(ApiError::internal_error(
                    "AuthContext not found in request extensions. \
                     Ensure auth_middleware is applied to this route.",
                ))
            })
    }
}

impl std::ops::Deref for AuthExtractor {
    type Target = AuthContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// ============================================================================
// RATE LIMITING MIDDLEWARE
// ============================================================================

/// Type alias for the keyed rate limiter we use.
type KeyedLimiter = RateLimiter<RateLimitKey, DefaultKeyedStateStore<RateLimitKey>, DefaultClock>;

/// Key for rate limiting - either IP address or user account ID.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub enum RateLimitKey {
    /// Unauthenticated request - keyed by IP address
    Ip(IpAddr),
    /// Authenticated request - keyed by account
    Account(String),
}

/// State for rate limiting middleware.
#[derive(Clone)]
pub struct RateLimitState {
    config: Arc<ApiConfig>,
    /// Limiter for unauthenticated requests, keyed by client IP.
    unauthenticated: Arc<KeyedLimiter>,
    /// Limiter for authenticated requests, keyed by account.
    authenticated: Arc<KeyedLimiter>,
}

impl RateLimitState {
    /// Create new rate limit state from API configuration.
    pub fn new(config: ApiConfig) -> Self {
        let unauthenticated = Arc::new(RateLimiter::keyed(quota(
            config.rate_limit_unauthenticated,
            config.rate_limit_burst,
        )));
        let authenticated = Arc::new(RateLimiter::keyed(quota(
            config.rate_limit_authenticated,
            config.rate_limit_burst,
        )));
        Self {
            config: Arc::new(config),
            unauthenticated,
            authenticated,
        }
    }
}

fn quota(requests_per_minute: u32, burst: u32) -> Quota {
    Quota::per_minute(NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN))
        .allow_burst(NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN))
}

/// Error type for rate limit middleware.
pub struct RateLimitError {
    /// Seconds until rate limit resets
    pub retry_after: u64,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let error = ApiError::too_many_requests();
        let mut response = (StatusCode::TOO_MANY_REQUESTS, axum::Json(error)).into_response();
        response.headers_mut().insert(
            axum::http::header::RETRY_AFTER,
            HeaderValue::from_str(&self.retry_after.to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("60")),
        );
        response
    }
}

/// Extract client IP from request, considering proxy headers.
fn extract_client_ip(request: &Request, peer: Option<std::net::SocketAddr>) -> IpAddr {
    // X-Forwarded-For can contain multiple IPs, take the first one
    if let Some(forwarded_for) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
    {
        if let Some(first_ip) = forwarded_for.split(',').next() {
            if let Ok(ip) = first_ip.trim().parse() {
                return ip;
            }
        }
    }

    if let Some(real_ip) = request
        .headers()
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
    {
        if let Ok(ip) = real_ip.trim().parse() {
            return ip;
        }
    }

    peer.map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED))
}

/// Rate limiting middleware.
///
/// Enforces limits by account for authenticated requests and by IP for
/// public ones. Protected routes layer this under `auth_middleware`, so the
/// auth context is already in extensions when the limiter keys the request.
/// When rate limited, returns 429 Too Many Requests with a Retry-After
/// header.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    if !state.config.rate_limit_enabled {
        return Ok(next.run(request).await);
    }

    // ConnectInfo exists when served with into_make_service_with_connect_info;
    // test drivers without it fall back to the unspecified address.
    let peer = request
        .extensions()
        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
        .map(|info| info.0);

    let (limiter, key, limit) = match request.extensions().get::<AuthContext>() {
        Some(auth) => (
            &state.authenticated,
            RateLimitKey::Account(auth.user_id.to_string()),
            state.config.rate_limit_authenticated,
        ),
        None => (
            &state.unauthenticated,
            RateLimitKey::Ip(extract_client_ip(&request, peer)),
            state.config.rate_limit_unauthenticated,
        ),
    };

    match limiter.check_key(&key) {
        Ok(_) => {
            let mut response = next.run(request).await;
            response.headers_mut().insert(
                axum::http::header::HeaderName::from_static("x-ratelimit-limit"),
                HeaderValue::from_str(&limit.to_string())
                    .unwrap_or_else(|_| HeaderValue::from_static("100")),
            );
            Ok(response)
        }
        Err(not_until) => {
            let retry_after = not_until
                .wait_time_from(governor::clock::Clock::now(&DefaultClock::default()))
                .as_secs()
                .max(1);
            Err(RateLimitError { retry_after })
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
