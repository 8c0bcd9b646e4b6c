//! Counsellor-related API types

use counsel_core::{AssignmentSlot, Branch, Counsellor, EntityId, Section, SlotKey, Timestamp};
use serde::{Deserialize, Serialize};

use super::assignment::SlotResponse;

/// One assignment slot in a registration or edit submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AssignmentSpecRequest {
    /// Year of study (1-4)
    pub year: i16,
    /// Semester within the year (1-2)
    pub semester: i16,
    pub branch: Branch,
    pub section: Section,
    /// Seat capacity, at least 1
    pub max_students: i32,
}

impl AssignmentSpecRequest {
    pub fn key(&self) -> SlotKey {
        SlotKey {
            year: self.year,
            semester: self.semester,
            branch: self.branch,
            section: self.section,
        }
    }
}

/// Request to register a counsellor together with their assignment slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RegisterCounsellorRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub department: Option<String>,
    /// Slots to create; each starts with zero bound students
    pub assignments: Vec<AssignmentSpecRequest>,
}

/// Request to replace a counsellor's full assignment list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct EditAssignmentsRequest {
    pub assignments: Vec<AssignmentSpecRequest>,
}

/// Response containing a list of counsellors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ListCounsellorsResponse {
    pub counsellors: Vec<CounsellorResponse>,
    pub total: i32,
}

/// Counsellor profile, optionally with assignment slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CounsellorResponse {
    #[schema(value_type = String, format = "uuid")]
    pub counsellor_id: EntityId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub department: Option<String>,
    /// Assignment slots, populated for registration and detail responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slots: Option<Vec<SlotResponse>>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: Timestamp,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: Timestamp,
}

impl From<Counsellor> for CounsellorResponse {
    fn from(counsellor: Counsellor) -> Self {
        Self {
            counsellor_id: counsellor.counsellor_id,
            name: counsellor.name,
            email: counsellor.email,
            phone: counsellor.phone,
            department: counsellor.department,
            slots: None,
            created_at: counsellor.created_at,
            updated_at: counsellor.updated_at,
        }
    }
}

impl CounsellorResponse {
    /// Attach assignment slots to the response.
    pub fn with_slots(mut self, slots: Vec<AssignmentSlot>) -> Self {
        self.slots = Some(slots.into_iter().map(SlotResponse::from).collect());
        self
    }
}
