//! Error Types for the Counselbase API
//!
//! This module defines error handling for the API layer, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//!
//! All errors are serialized as JSON with appropriate HTTP status codes.
//! The `message` field is surfaced verbatim to clients; nothing in this
//! system is retried automatically and no error is fatal to the server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use counsel_core::{CounselError, EntityType, StorageError, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each error code maps to a specific HTTP status code and represents
/// a category of error that can occur during API operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Authentication Errors (401, 403)
    // ========================================================================
    /// Request lacks valid authentication credentials
    Unauthorized,

    /// Request is authenticated but lacks permission for the resource
    Forbidden,

    /// Authentication token is invalid or malformed
    InvalidToken,

    /// Authentication token has expired
    TokenExpired,

    // ========================================================================
    // Validation Errors (400)
    // ========================================================================
    /// Request validation failed
    ValidationFailed,

    /// Request contains invalid input data
    InvalidInput,

    /// Required field is missing from request
    MissingField,

    /// Field value is out of valid range
    InvalidRange,

    /// Field value has an invalid format
    InvalidFormat,

    // ========================================================================
    // Not Found Errors (404)
    // ========================================================================
    /// Requested entity does not exist
    EntityNotFound,

    /// Requested student does not exist
    StudentNotFound,

    /// Requested counsellor does not exist
    CounsellorNotFound,

    /// No assignment slot matches the requested tuple
    SlotNotFound,

    /// Requested counselling session does not exist
    SessionNotFound,

    /// Requested user account does not exist
    UserNotFound,

    // ========================================================================
    // Conflict Errors (409)
    // ========================================================================
    /// Entity with the same identifier already exists
    EntityAlreadyExists,

    /// The target slot is at capacity; the bind was rejected with no mutation
    CapacityExceeded,

    /// Two assignments in one submission share a slot tuple
    DuplicateSlot,

    /// Slot removal or shrink refused while students are still bound to it
    SlotOccupied,

    /// Operation conflicts with current state
    StateConflict,

    // ========================================================================
    // Server Errors (429, 500, 503)
    // ========================================================================
    /// Internal server error
    InternalError,

    /// Storage operation failed
    StorageFailure,

    /// Service is temporarily unavailable
    ServiceUnavailable,

    /// Request rate limit exceeded
    TooManyRequests,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            // Authentication errors
            ErrorCode::Unauthorized | ErrorCode::InvalidToken | ErrorCode::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }

            ErrorCode::Forbidden => StatusCode::FORBIDDEN,

            // Validation errors
            ErrorCode::ValidationFailed
            | ErrorCode::InvalidInput
            | ErrorCode::MissingField
            | ErrorCode::InvalidRange
            | ErrorCode::InvalidFormat => StatusCode::BAD_REQUEST,

            // Not found errors
            ErrorCode::EntityNotFound
            | ErrorCode::StudentNotFound
            | ErrorCode::CounsellorNotFound
            | ErrorCode::SlotNotFound
            | ErrorCode::SessionNotFound
            | ErrorCode::UserNotFound => StatusCode::NOT_FOUND,

            // Conflict errors
            ErrorCode::EntityAlreadyExists
            | ErrorCode::CapacityExceeded
            | ErrorCode::DuplicateSlot
            | ErrorCode::SlotOccupied
            | ErrorCode::StateConflict => StatusCode::CONFLICT,

            // Server errors
            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            ErrorCode::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,

            ErrorCode::InternalError | ErrorCode::StorageFailure => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            // Authentication
            ErrorCode::Unauthorized => "Authentication required",
            ErrorCode::Forbidden => "Access forbidden",
            ErrorCode::InvalidToken => "Invalid authentication token",
            ErrorCode::TokenExpired => "Authentication token has expired",

            // Validation
            ErrorCode::ValidationFailed => "Request validation failed",
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::MissingField => "Required field is missing",
            ErrorCode::InvalidRange => "Value is out of valid range",
            ErrorCode::InvalidFormat => "Value has an invalid format",

            // Not Found
            ErrorCode::EntityNotFound => "Entity not found",
            ErrorCode::StudentNotFound => "Student not found",
            ErrorCode::CounsellorNotFound => "Counsellor not found",
            ErrorCode::SlotNotFound => "No assignment slot matches the requested tuple",
            ErrorCode::SessionNotFound => "Counselling session not found",
            ErrorCode::UserNotFound => "User account not found",

            // Conflict
            ErrorCode::EntityAlreadyExists => "Entity already exists",
            ErrorCode::CapacityExceeded => "Counsellor slot is already full",
            ErrorCode::DuplicateSlot => "Duplicate assignment slot in submission",
            ErrorCode::SlotOccupied => "Slot still has bound students",
            ErrorCode::StateConflict => "Operation conflicts with current state",

            // Server
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::StorageFailure => "Storage operation failed",
            ErrorCode::ServiceUnavailable => "Service temporarily unavailable",
            ErrorCode::TooManyRequests => "Rate limit exceeded",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response for API operations.
///
/// This type is returned by all API endpoints when an error occurs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details (field errors and the like)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.default_message().to_string(),
            details: None,
        }
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    /// Create an Unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Create a Forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Create an InvalidToken error.
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidToken, message)
    }

    /// Create a TokenExpired error.
    pub fn token_expired() -> Self {
        Self::from_code(ErrorCode::TokenExpired)
    }

    /// Create a ValidationFailed error.
    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    /// Create an InvalidInput error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Create a MissingField error.
    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingField,
            format!("Required field '{}' is missing", field),
        )
    }

    /// Create an InvalidFormat error.
    pub fn invalid_format(field: &str, expected: &str) -> Self {
        Self::new(
            ErrorCode::InvalidFormat,
            format!("Field '{}' must be {}", field, expected),
        )
    }

    /// Create an InvalidRange error.
    pub fn invalid_range(field: &str, min: impl fmt::Display, max: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::InvalidRange,
            format!("Field '{}' must be between {} and {}", field, min, max),
        )
    }

    /// Create a StudentNotFound error.
    pub fn student_not_found(id: impl fmt::Display) -> Self {
        Self::new(ErrorCode::StudentNotFound, format!("Student {} not found", id))
    }

    /// Create a CounsellorNotFound error.
    pub fn counsellor_not_found(id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::CounsellorNotFound,
            format!("Counsellor {} not found", id),
        )
    }

    /// Create a SlotNotFound error.
    pub fn slot_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SlotNotFound, message)
    }

    /// Create a SessionNotFound error.
    pub fn session_not_found(id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::SessionNotFound,
            format!("Counselling session {} not found", id),
        )
    }

    /// Create a UserNotFound error.
    pub fn user_not_found(username: &str) -> Self {
        Self::new(
            ErrorCode::UserNotFound,
            format!("User account '{}' not found", username),
        )
    }

    /// Create an EntityAlreadyExists error.
    pub fn entity_already_exists(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::EntityAlreadyExists, message)
    }

    /// Create a CapacityExceeded error.
    pub fn capacity_exceeded(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CapacityExceeded, message)
    }

    /// Create a StateConflict error.
    pub fn state_conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StateConflict, message)
    }

    /// Create an InternalError.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Create a TooManyRequests error.
    pub fn too_many_requests() -> Self {
        Self::from_code(ErrorCode::TooManyRequests)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

/// Implement IntoResponse for ApiError to enable automatic error handling in Axum.
///
/// This allows ApiError to be returned directly from Axum handlers:
/// ```ignore
/// async fn handler() -> Result<Json<Response>, ApiError> {
///     Err(ApiError::unauthorized("Invalid credentials"))
/// }
/// ```
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self);
        (status, body).into_response()
    }
}

// ============================================================================
// CONVERSIONS FROM DOMAIN ERRORS
// ============================================================================

/// Map entity types to their not-found error code.
fn not_found_code(entity_type: EntityType) -> ErrorCode {
    match entity_type {
        EntityType::Student => ErrorCode::StudentNotFound,
        EntityType::Counsellor => ErrorCode::CounsellorNotFound,
        EntityType::AssignmentSlot => ErrorCode::SlotNotFound,
        EntityType::CounsellingSession => ErrorCode::SessionNotFound,
        EntityType::UserAccount => ErrorCode::UserNotFound,
    }
}

/// Convert storage errors to API errors, preserving messages verbatim.
impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        let message = err.to_string();
        match err {
            StorageError::NotFound { entity_type, .. } => {
                ApiError::new(not_found_code(entity_type), message)
            }
            StorageError::SlotMissing { .. } => ApiError::new(ErrorCode::SlotNotFound, message),
            StorageError::CapacityExceeded { .. } => {
                ApiError::new(ErrorCode::CapacityExceeded, message)
            }
            StorageError::DuplicateSlot { .. } => ApiError::new(ErrorCode::DuplicateSlot, message),
            StorageError::SlotOccupied { .. } => ApiError::new(ErrorCode::SlotOccupied, message),
            StorageError::InsertFailed { .. } => {
                ApiError::new(ErrorCode::EntityAlreadyExists, message)
            }
            StorageError::UpdateFailed { .. }
            | StorageError::TransactionFailed { .. }
            | StorageError::LockPoisoned => {
                tracing::error!("Storage failure: {}", message);
                ApiError::new(ErrorCode::StorageFailure, message)
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        let message = err.to_string();
        match err {
            ValidationError::RequiredFieldMissing { .. } => {
                ApiError::new(ErrorCode::MissingField, message)
            }
            ValidationError::InvalidValue { .. } => ApiError::new(ErrorCode::InvalidInput, message),
            ValidationError::ConstraintViolation { .. } => {
                ApiError::new(ErrorCode::ValidationFailed, message)
            }
        }
    }
}

impl From<CounselError> for ApiError {
    fn from(err: CounselError) -> Self {
        match err {
            CounselError::Storage(e) => e.into(),
            CounselError::Validation(e) => e.into(),
            CounselError::Config(e) => {
                tracing::error!("Configuration error: {}", e);
                ApiError::internal_error(e.to_string())
            }
        }
    }
}

/// Convert from serde_json::Error to ApiError.
impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::invalid_input(format!("Invalid JSON: {}", err))
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_code_status_mapping() {
        assert_eq!(ErrorCode::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::ValidationFailed.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::StudentNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::CapacityExceeded.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::DuplicateSlot.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::SlotOccupied.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::TooManyRequests.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            ErrorCode::InternalError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_capacity_exceeded_maps_to_conflict() {
        let slot_id = Uuid::now_v7();
        let err: ApiError = StorageError::CapacityExceeded {
            slot_id,
            max_students: 30,
        }
        .into();
        assert_eq!(err.code, ErrorCode::CapacityExceeded);
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        // The storage message reaches the client verbatim.
        assert!(err.message.contains(&slot_id.to_string()));
    }

    #[test]
    fn test_not_found_maps_per_entity() {
        let err: ApiError = StorageError::NotFound {
            entity_type: EntityType::Counsellor,
            id: Uuid::now_v7(),
        }
        .into();
        assert_eq!(err.code, ErrorCode::CounsellorNotFound);
    }

    #[test]
    fn test_api_error_constructors() {
        let err = ApiError::unauthorized("Invalid credentials");
        assert_eq!(err.code, ErrorCode::Unauthorized);
        assert_eq!(err.message, "Invalid credentials");

        let err = ApiError::missing_field("section");
        assert_eq!(err.code, ErrorCode::MissingField);
        assert!(err.message.contains("section"));
    }

    #[test]
    fn test_error_serialization() -> Result<(), serde_json::Error> {
        let err = ApiError::capacity_exceeded("Slot is full");
        let json = serde_json::to_string(&err)?;

        assert!(json.contains("CAPACITY_EXCEEDED"));
        assert!(json.contains("Slot is full"));

        let deserialized: ApiError = serde_json::from_str(&json)?;
        assert_eq!(deserialized, err);
        Ok(())
    }
}
