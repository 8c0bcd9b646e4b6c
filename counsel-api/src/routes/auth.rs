//! Authentication REST API Routes
//!
//! Login (public), current-account lookup, and admin account registration.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use counsel_core::{hash_password, new_entity_id, verify_password, Role, UserAccount};
use counsel_storage::Storage;

use crate::{
    auth::{generate_jwt_token, AuthConfig},
    error::{ApiError, ApiResult},
    middleware::AuthExtractor,
    state::AppState,
    types::{AccountResponse, LoginRequest, LoginResponse, RegisterUserRequest},
    validation::ValidateNonEmpty,
};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /api/v1/auth/login - Exchange credentials for a JWT
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login succeeded", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ApiError),
    )
)]
pub async fn login(
    State(storage): State<Arc<dyn Storage>>,
    State(auth_config): State<AuthConfig>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    req.username.validate_non_empty("username")?;
    req.password.validate_non_empty("password")?;

    // A missing account and a wrong password answer identically so usernames
    // cannot be probed.
    let account = storage
        .user_get_by_username(&req.username)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid username or password"))?;

    if !verify_password(account.user_id, &req.password, &account.password_digest) {
        return Err(ApiError::unauthorized("Invalid username or password"));
    }

    let token = generate_jwt_token(&account, &auth_config)?;
    tracing::info!(username = %account.username, role = %account.role, "Login");

    Ok(Json(LoginResponse {
        token,
        account: account.into(),
    }))
}

/// GET /api/v1/auth/me - The authenticated account
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current account", body = AccountResponse),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(
        ("api_key" = []),
        ("bearer_auth" = [])
    )
)]
pub async fn me(
    State(storage): State<Arc<dyn Storage>>,
    AuthExtractor(auth): AuthExtractor,
) -> ApiResult<Json<AccountResponse>> {
    let account = storage
        .user_get(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::user_not_found(&auth.username))?;
    Ok(Json(account.into()))
}

/// POST /api/v1/auth/register - Create a user account (admin only)
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Auth",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "Account created", body = AccountResponse),
        (status = 403, description = "Forbidden", body = ApiError),
        (status = 409, description = "Username taken", body = ApiError),
    ),
    security(
        ("api_key" = []),
        ("bearer_auth" = [])
    )
)]
pub async fn register(
    State(storage): State<Arc<dyn Storage>>,
    AuthExtractor(auth): AuthExtractor,
    Json(req): Json<RegisterUserRequest>,
) -> ApiResult<impl IntoResponse> {
    auth.require_role(&[Role::Admin])?;
    req.username.validate_non_empty("username")?;
    req.password.validate_non_empty("password")?;

    let user_id = new_entity_id();
    let account = UserAccount {
        user_id,
        username: req.username.trim().to_string(),
        password_digest: hash_password(user_id, &req.password),
        role: req.role,
        subject_id: req.subject_id,
        created_at: chrono::Utc::now(),
    };

    storage.user_insert(&account).await?;
    tracing::info!(username = %account.username, role = %account.role, "Account registered");

    Ok((StatusCode::CREATED, Json(AccountResponse::from(account))))
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

/// Routes that require authentication.
pub fn create_router(state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/me", axum::routing::get(me))
        .route("/register", axum::routing::post(register))
        .with_state(state)
}

/// The public login route, mounted outside the auth middleware.
pub fn create_public_router(state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/login", axum::routing::post(login))
        .with_state(state)
}
