//! Authentication Module
//!
//! This module provides authentication and authorization for the Counselbase
//! API. It supports two authentication methods:
//! 1. API Key authentication (via X-API-Key header) — intended for trusted
//!    back-office integrations; carries admin privileges.
//! 2. JWT token authentication (via Authorization: Bearer header), issued by
//!    the login route and carrying the account's role.

use crate::error::{ApiError, ApiResult};
use counsel_core::{EntityId, Role, UserAccount};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

// ============================================================================
// CLOCK ABSTRACTION (FOR DETERMINISTIC TESTS)
// ============================================================================

/// Clock abstraction for JWT time validation.
///
/// By owning time validation ourselves (instead of letting `jsonwebtoken`
/// do it), expiry checks become injectable in tests and immune to broken CI
/// clocks.
pub trait JwtClock: Send + Sync {
    /// Get current time as Unix epoch seconds.
    fn now_epoch_secs(&self) -> i64;
}

/// Production clock using system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl JwtClock for SystemClock {
    fn now_epoch_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Fixed clock for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl JwtClock for FixedClock {
    fn now_epoch_secs(&self) -> i64 {
        self.0
    }
}

// ============================================================================
// JWT SECRET (TYPE-SAFE)
// ============================================================================

const INSECURE_DEFAULT_SECRET: &str = "INSECURE_DEFAULT_SECRET_CHANGE_IN_PRODUCTION";

/// Type-safe JWT secret that prevents accidental logging.
#[derive(Clone)]
pub struct JwtSecret(SecretString);

impl JwtSecret {
    /// Create a new JWT secret. Empty or whitespace-only values fall back to
    /// the insecure development default.
    pub fn new(secret: String) -> Self {
        let normalized = if secret.trim().is_empty() {
            INSECURE_DEFAULT_SECRET.to_string()
        } else {
            secret
        };
        Self(SecretString::new(normalized.into()))
    }

    /// Expose the secret value (only for cryptographic operations).
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Get the length of the secret without exposing it.
    pub fn len(&self) -> usize {
        self.0.expose_secret().len()
    }

    /// Check if the secret is empty without exposing it.
    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }

    /// Check if the secret is the insecure default.
    pub fn is_insecure_default(&self) -> bool {
        self.0.expose_secret() == INSECURE_DEFAULT_SECRET
    }
}

impl std::fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JwtSecret([REDACTED, {} chars])", self.len())
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Authentication configuration.
#[derive(Clone)]
pub struct AuthConfig {
    /// Valid API keys (in production, load from secure storage)
    pub api_keys: HashSet<String>,

    /// JWT secret key for signing and verification
    pub jwt_secret: JwtSecret,

    /// JWT algorithm (default: HS256)
    pub jwt_algorithm: Algorithm,

    /// JWT token expiration in seconds (default: 1 hour)
    pub jwt_expiration_secs: i64,

    /// JWT clock skew tolerance in seconds (default: 60)
    pub jwt_clock_skew_secs: i64,

    /// Clock for JWT time validation (injected for testing)
    pub clock: Arc<dyn JwtClock>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_keys", &format!("[{} keys]", self.api_keys.len()))
            .field("jwt_secret", &self.jwt_secret)
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("jwt_expiration_secs", &self.jwt_expiration_secs)
            .field("jwt_clock_skew_secs", &self.jwt_clock_skew_secs)
            .field("clock", &"<JwtClock>")
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_keys: HashSet::new(),
            jwt_secret: JwtSecret::new(
                std::env::var("COUNSEL_JWT_SECRET").unwrap_or_default(),
            ),
            jwt_algorithm: Algorithm::HS256,
            jwt_expiration_secs: 3600,
            jwt_clock_skew_secs: 60,
            clock: Arc::new(SystemClock),
        }
    }
}

impl AuthConfig {
    /// Create authentication configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `COUNSEL_API_KEYS`: Comma-separated list of valid API keys
    /// - `COUNSEL_JWT_SECRET`: JWT signing secret
    /// - `COUNSEL_JWT_EXPIRATION_SECS`: JWT token expiration (default: 3600)
    /// - `COUNSEL_JWT_CLOCK_SKEW_SECS`: JWT clock skew tolerance (default: 60)
    pub fn from_env() -> Self {
        let mut api_keys = HashSet::new();
        if let Ok(keys_str) = std::env::var("COUNSEL_API_KEYS") {
            for key in keys_str.split(',') {
                let trimmed = key.trim();
                if !trimmed.is_empty() {
                    api_keys.insert(trimmed.to_string());
                }
            }
        }

        Self {
            api_keys,
            jwt_secret: JwtSecret::new(
                std::env::var("COUNSEL_JWT_SECRET").unwrap_or_default(),
            ),
            jwt_algorithm: Algorithm::HS256,
            jwt_expiration_secs: std::env::var("COUNSEL_JWT_EXPIRATION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3600),
            jwt_clock_skew_secs: std::env::var("COUNSEL_JWT_CLOCK_SKEW_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            clock: Arc::new(SystemClock),
        }
    }

    /// Validate the authentication configuration for production use.
    ///
    /// Called at server startup; in development mode weaknesses are logged
    /// as warnings and the server continues.
    pub fn validate_for_production(&self) -> ApiResult<()> {
        let environment = std::env::var("COUNSEL_ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase();
        let is_production = environment == "production" || environment == "prod";

        if self.jwt_secret.is_insecure_default() {
            if is_production {
                return Err(ApiError::invalid_input(
                    "Cannot start server in production with the insecure default JWT secret. \
                     Set COUNSEL_JWT_SECRET to a secure value.",
                ));
            }
            tracing::warn!(
                "Using insecure default JWT secret. Set COUNSEL_JWT_SECRET before deploying."
            );
        } else if self.jwt_secret.len() < 32 {
            if is_production {
                return Err(ApiError::invalid_input(format!(
                    "JWT secret is too short for production use ({} chars). \
                     It must be at least 32 characters long.",
                    self.jwt_secret.len()
                )));
            }
            tracing::warn!(
                "JWT secret is short ({} chars); use at least 32 for production.",
                self.jwt_secret.len()
            );
        }

        Ok(())
    }

    /// Check if an API key is valid.
    pub fn is_valid_api_key(&self, key: &str) -> bool {
        self.api_keys.contains(key)
    }
}

// ============================================================================
// JWT CLAIMS
// ============================================================================

/// JWT claims structure: the standard claims plus the account role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user account ID)
    pub sub: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Username, for display
    pub username: String,

    /// Account role
    pub role: Role,

    /// Linked counsellor/student record, if any
    pub subject_id: Option<Uuid>,
}

impl Claims {
    /// Create new claims for a user account.
    pub fn new(account: &UserAccount, expiration_secs: i64, clock: &dyn JwtClock) -> Self {
        let now = clock.now_epoch_secs();
        Self {
            sub: account.user_id.to_string(),
            iat: now,
            exp: now + expiration_secs,
            username: account.username.clone(),
            role: account.role,
            subject_id: account.subject_id,
        }
    }

    /// Check if the token has expired according to a clock.
    pub fn is_expired(&self, clock: &dyn JwtClock, skew_secs: i64) -> bool {
        self.exp + skew_secs < clock.now_epoch_secs()
    }
}

// ============================================================================
// AUTHENTICATION CONTEXT
// ============================================================================

/// Authentication method used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// API key authentication
    ApiKey,

    /// JWT token authentication
    Jwt,
}

/// Authentication context extracted from the request.
///
/// Injected into Axum request extensions after successful authentication.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// User account ID (nil for API-key requests)
    pub user_id: EntityId,

    /// Username or API key identifier
    pub username: String,

    /// Account role
    pub role: Role,

    /// Linked counsellor/student record, if any
    pub subject_id: Option<EntityId>,

    /// Authentication method used
    pub auth_method: AuthMethod,
}

impl AuthContext {
    /// Require one of the given roles, or fail with Forbidden.
    pub fn require_role(&self, allowed: &[Role]) -> ApiResult<()> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!(
                "Role '{}' may not perform this operation",
                self.role
            )))
        }
    }

    /// True when the context belongs to the given student record.
    ///
    /// Admins act on behalf of any student; a student account only on its
    /// own record.
    pub fn may_act_for_student(&self, student_id: EntityId) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Student => self.subject_id == Some(student_id),
            Role::Counsellor => false,
        }
    }
}

// ============================================================================
// TOKEN GENERATION / VALIDATION
// ============================================================================

/// Generate a signed JWT for a user account.
pub fn generate_jwt_token(account: &UserAccount, config: &AuthConfig) -> ApiResult<String> {
    let claims = Claims::new(account, config.jwt_expiration_secs, config.clock.as_ref());
    encode(
        &Header::new(config.jwt_algorithm),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.expose().as_bytes()),
    )
    .map_err(|e| ApiError::internal_error(format!("Failed to sign token: {}", e)))
}

/// Validate a JWT and return its claims.
///
/// Signature validation is delegated to `jsonwebtoken`; expiry is checked
/// against the injected clock with the configured skew tolerance.
pub fn validate_jwt_token(token: &str, config: &AuthConfig) -> ApiResult<Claims> {
    let mut validation = Validation::new(config.jwt_algorithm);
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.expose().as_bytes()),
        &validation,
    )
    .map_err(|e| ApiError::invalid_token(format!("Invalid token: {}", e)))?;

    if data.claims.is_expired(config.clock.as_ref(), config.jwt_clock_skew_secs) {
        return Err(ApiError::token_expired());
    }

    Ok(data.claims)
}

/// Authenticate a request from its credential headers.
///
/// API key takes precedence over a bearer token when both are present.
pub fn authenticate(
    api_key: Option<&str>,
    bearer_token: Option<&str>,
    config: &AuthConfig,
) -> ApiResult<AuthContext> {
    if let Some(key) = api_key {
        if config.is_valid_api_key(key) {
            return Ok(AuthContext {
                user_id: Uuid::nil(),
                username: "api-key".to_string(),
                role: Role::Admin,
                subject_id: None,
                auth_method: AuthMethod::ApiKey,
            });
        }
        return Err(ApiError::unauthorized("Invalid API key"));
    }

    if let Some(token) = bearer_token {
        let claims = validate_jwt_token(token, config)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ApiError::invalid_token("Token subject is not a valid user id"))?;
        return Ok(AuthContext {
            user_id,
            username: claims.username,
            role: claims.role,
            subject_id: claims.subject_id,
            auth_method: AuthMethod::Jwt,
        });
    }

    Err(ApiError::unauthorized(
        "Provide an X-API-Key header or an Authorization: Bearer token",
    ))
}
