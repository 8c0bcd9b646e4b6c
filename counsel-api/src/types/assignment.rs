//! Assignment-workflow API types

use counsel_core::{AssignmentSlot, Branch, Counsellor, EntityId, Section, SlotKey, Timestamp};
use serde::{Deserialize, Serialize};

/// Request body for the bind operation (the update-semester flow).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct BindStudentRequest {
    #[schema(value_type = String, format = "uuid")]
    pub student_id: EntityId,
    /// The counsellor whose slot the student selected
    #[schema(value_type = String, format = "uuid")]
    pub counsellor_id: EntityId,
    pub year: i16,
    pub semester: i16,
    pub branch: Branch,
    pub section: Section,
}

impl BindStudentRequest {
    pub fn key(&self) -> SlotKey {
        SlotKey {
            year: self.year,
            semester: self.semester,
            branch: self.branch,
            section: self.section,
        }
    }
}

/// One assignment slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SlotResponse {
    #[schema(value_type = String, format = "uuid")]
    pub slot_id: EntityId,
    #[schema(value_type = String, format = "uuid")]
    pub counsellor_id: EntityId,
    pub year: i16,
    pub semester: i16,
    pub branch: Branch,
    pub section: Section,
    pub max_students: i32,
    pub current_students: i32,
    /// Convenience flag so clients can grey out full slots
    pub is_full: bool,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: Timestamp,
}

impl From<AssignmentSlot> for SlotResponse {
    fn from(slot: AssignmentSlot) -> Self {
        let is_full = slot.is_full();
        Self {
            slot_id: slot.slot_id,
            counsellor_id: slot.counsellor_id,
            year: slot.year,
            semester: slot.semester,
            branch: slot.branch,
            section: slot.section,
            max_students: slot.max_students,
            current_students: slot.current_students,
            is_full,
            created_at: slot.created_at,
        }
    }
}

/// One row of the available-slots listing: a slot with its owner's profile.
///
/// Full slots are included (marked `is_full`) so the client can show the
/// whole table; rows are sorted by occupancy, least loaded first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AvailableSlotResponse {
    #[schema(value_type = String, format = "uuid")]
    pub slot_id: EntityId,
    #[schema(value_type = String, format = "uuid")]
    pub counsellor_id: EntityId,
    pub counsellor_name: String,
    pub counsellor_email: String,
    pub department: Option<String>,
    pub max_students: i32,
    pub current_students: i32,
    pub is_full: bool,
}

impl AvailableSlotResponse {
    pub fn from_pair(slot: AssignmentSlot, counsellor: Counsellor) -> Self {
        let is_full = slot.is_full();
        Self {
            slot_id: slot.slot_id,
            counsellor_id: counsellor.counsellor_id,
            counsellor_name: counsellor.name,
            counsellor_email: counsellor.email,
            department: counsellor.department,
            max_students: slot.max_students,
            current_students: slot.current_students,
            is_full,
        }
    }
}
