//! Authentication API types

use counsel_core::{EntityId, Role, Timestamp, UserAccount};
use serde::{Deserialize, Serialize};

/// Request to log in with username and password.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    /// Account username (roll number for students)
    pub username: String,
    /// Plaintext password, verified against the stored digest
    pub password: String,
}

/// Response to a successful login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LoginResponse {
    /// Signed JWT for subsequent requests
    pub token: String,
    /// The authenticated account
    pub account: AccountResponse,
}

/// Request to register a new user account (admin only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RegisterUserRequest {
    pub username: String,
    pub password: String,
    pub role: Role,
    /// Linked counsellor/student record, if any
    #[schema(value_type = Option<String>, format = "uuid")]
    pub subject_id: Option<EntityId>,
}

/// User account details, without the password digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AccountResponse {
    #[schema(value_type = String, format = "uuid")]
    pub user_id: EntityId,
    pub username: String,
    pub role: Role,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub subject_id: Option<EntityId>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: Timestamp,
}

impl From<UserAccount> for AccountResponse {
    fn from(account: UserAccount) -> Self {
        Self {
            user_id: account.user_id,
            username: account.username,
            role: account.role,
            subject_id: account.subject_id,
            created_at: account.created_at,
        }
    }
}
