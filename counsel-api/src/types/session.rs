//! Counselling-session API types

use counsel_core::{CounsellingSession, EntityId, Timestamp};
use serde::{Deserialize, Serialize};

/// Request to record a counselling session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CreateSessionRequest {
    #[schema(value_type = String, format = "uuid")]
    pub counsellor_id: EntityId,
    #[schema(value_type = String, format = "uuid")]
    pub student_id: EntityId,
    #[schema(value_type = String, format = "date-time")]
    pub held_at: Timestamp,
    pub summary: String,
    pub follow_up: Option<String>,
}

/// Request to update a recorded session.
///
/// `follow_up` uses double-option semantics: absent leaves the field
/// untouched, `null` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UpdateSessionRequest {
    #[schema(value_type = Option<String>, format = "date-time")]
    pub held_at: Option<Timestamp>,
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub follow_up: Option<Option<String>>,
}

/// Distinguish an absent field from an explicit null.
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

/// Query parameters for listing sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ListSessionsQuery {
    #[schema(value_type = Option<String>, format = "uuid")]
    pub student_id: Option<EntityId>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub counsellor_id: Option<EntityId>,
}

/// Response containing a list of sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ListSessionsResponse {
    pub sessions: Vec<SessionResponse>,
    pub total: i32,
}

/// Counselling session with full details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SessionResponse {
    #[schema(value_type = String, format = "uuid")]
    pub session_id: EntityId,
    #[schema(value_type = String, format = "uuid")]
    pub counsellor_id: EntityId,
    #[schema(value_type = String, format = "uuid")]
    pub student_id: EntityId,
    #[schema(value_type = String, format = "date-time")]
    pub held_at: Timestamp,
    pub summary: String,
    pub follow_up: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: Timestamp,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: Timestamp,
}

impl From<CounsellingSession> for SessionResponse {
    fn from(session: CounsellingSession) -> Self {
        Self {
            session_id: session.session_id,
            counsellor_id: session.counsellor_id,
            student_id: session.student_id,
            held_at: session.held_at,
            summary: session.summary,
            follow_up: session.follow_up,
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_follow_up_differs_from_explicit_null() {
        let absent: UpdateSessionRequest = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(absent.follow_up, None);

        let cleared: UpdateSessionRequest =
            serde_json::from_str(r#"{"follow_up": null}"#).unwrap();
        assert_eq!(cleared.follow_up, Some(None));

        let set: UpdateSessionRequest =
            serde_json::from_str(r#"{"follow_up": "call parents"}"#).unwrap();
        assert_eq!(set.follow_up, Some(Some("call parents".to_string())));
    }
}
