//! OpenAPI Specification for the Counselbase API
//!
//! This module defines the OpenAPI document for the REST API. It uses
//! utoipa to generate the specification from Rust types and route
//! annotations.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error::{ApiError, ErrorCode};
use crate::types::*;

// Import route modules for path references
use crate::routes::{assignment, auth, counsellor, health, session, student};

// Import domain types from counsel-core
use counsel_core::{
    AssignmentSlot, Branch, Counsellor, CounsellingSession, Role, Section, SlotKey, Student,
};

/// OpenAPI document for the Counselbase API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Counselbase API",
        version = "0.2.0",
        description = "College counselling management backend: counsellor capacity and assignment workflow, student records, and counselling-session logging",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT"),
    ),
    servers(
        (url = "http://localhost:8080", description = "Local Development")
    ),
    tags(
        (name = "Auth", description = "Login and account management"),
        (name = "Students", description = "Student records"),
        (name = "Counsellors", description = "Counsellor profiles and assignment slots"),
        (name = "Assignments", description = "Slot queries and the student bind flow"),
        (name = "Sessions", description = "Counselling session records with draft autosave"),
        (name = "Health", description = "Deployment probes")
    ),
    paths(
        // === Auth Routes ===
        auth::login,
        auth::me,
        auth::register,

        // === Student Routes ===
        student::create_student,
        student::list_students,
        student::get_student,
        student::update_student,

        // === Counsellor Routes ===
        counsellor::register_counsellor,
        counsellor::list_counsellors,
        counsellor::get_counsellor,
        counsellor::list_counsellor_slots,
        counsellor::edit_assignments,
        counsellor::delete_counsellor,

        // === Assignment Routes ===
        assignment::available_slots,
        assignment::bind_student,

        // === Session Routes ===
        session::create_session,
        session::list_sessions,
        session::get_session,
        session::update_session,
        session::draft_session,

        // === Health ===
        health::health,
    ),
    components(
        schemas(
            // === Error Types ===
            ApiError, ErrorCode,

            // === Auth Types ===
            LoginRequest, LoginResponse, RegisterUserRequest, AccountResponse,

            // === Student Types ===
            CreateStudentRequest, UpdateStudentRequest, ListStudentsQuery,
            ListStudentsResponse, StudentResponse,

            // === Counsellor Types ===
            RegisterCounsellorRequest, EditAssignmentsRequest, AssignmentSpecRequest,
            ListCounsellorsResponse, CounsellorResponse,

            // === Assignment Types ===
            BindStudentRequest, SlotResponse, AvailableSlotResponse,

            // === Session Types ===
            CreateSessionRequest, UpdateSessionRequest, ListSessionsQuery,
            ListSessionsResponse, SessionResponse,

            // === Health ===
            health::HealthResponse,

            // === Core Domain Types (from counsel-core) ===
            Branch, Section, Role, SlotKey,
            Counsellor, AssignmentSlot, Student, CounsellingSession,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Security scheme modifier for OpenAPI document.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            // API Key authentication (header)
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-API-Key"))),
            );

            // Bearer token authentication (JWT)
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT Bearer token"))
                        .build(),
                ),
            );
        }
    }
}

impl ApiDoc {
    /// Generate OpenAPI spec as JSON string.
    pub fn to_json() -> Result<String, serde_json::Error> {
        let openapi = Self::openapi();
        serde_json::to_string_pretty(&openapi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_generates() -> Result<(), String> {
        let openapi = ApiDoc::openapi();

        assert_eq!(openapi.info.title, "Counselbase API");

        let tags = openapi
            .tags
            .as_ref()
            .ok_or_else(|| "OpenAPI tags missing".to_string())?;
        assert_eq!(tags.len(), 6);

        let json = ApiDoc::to_json().map_err(|e| e.to_string())?;
        assert!(json.contains("/api/v1/assignments/bind"));
        assert!(json.contains("CAPACITY_EXCEEDED"));
        Ok(())
    }
}
