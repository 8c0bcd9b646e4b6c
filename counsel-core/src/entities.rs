//! Core entity structures

use crate::{Branch, EntityId, PasswordDigest, Role, Section, SlotKey, Timestamp};
use serde::{Deserialize, Serialize};

/// Counsellor profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Counsellor {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub counsellor_id: EntityId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub department: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

/// A capacity-tracked assignment slot owned by a counsellor.
///
/// The unit of the assignment workflow: students bind to a slot whose
/// (year, semester, branch, section) tuple matches their own. The
/// `current_students <= max_students` invariant holds at all times; the
/// storage layer enforces it inside the bind transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AssignmentSlot {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub slot_id: EntityId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub counsellor_id: EntityId,
    pub year: i16,
    pub semester: i16,
    pub branch: Branch,
    pub section: Section,
    /// Capacity limit, always >= 1.
    pub max_students: i32,
    /// Occupancy counter, 0 <= current_students <= max_students.
    pub current_students: i32,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
}

impl AssignmentSlot {
    /// The (year, semester, branch, section) tuple of this slot.
    pub fn key(&self) -> SlotKey {
        SlotKey {
            year: self.year,
            semester: self.semester,
            branch: self.branch,
            section: self.section,
        }
    }

    /// Whether the slot has reached its capacity limit.
    pub fn is_full(&self) -> bool {
        self.current_students >= self.max_students
    }
}

/// Student record, including the counsellor binding.
///
/// `counsellor_id` is None until the student runs the update-semester flow
/// and binds to a slot. Student records are never hard-deleted; they are
/// retained for session history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Student {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub student_id: EntityId,
    /// Institutional roll number, unique per student.
    pub roll_no: String,
    pub name: String,
    pub email: String,
    pub year: i16,
    pub semester: i16,
    pub branch: Branch,
    pub section: Section,
    /// The counsellor this student is bound to, if any.
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "uuid"))]
    pub counsellor_id: Option<EntityId>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

impl Student {
    /// The student's current (year, semester, branch, section) tuple.
    pub fn slot_key(&self) -> SlotKey {
        SlotKey {
            year: self.year,
            semester: self.semester,
            branch: self.branch,
            section: self.section,
        }
    }
}

/// Record of one counselling session between a counsellor and a student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CounsellingSession {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub session_id: EntityId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub counsellor_id: EntityId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub student_id: EntityId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub held_at: Timestamp,
    pub summary: String,
    /// Follow-up action agreed during the session, if any.
    pub follow_up: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

/// User account backing login.
///
/// `subject_id` links the account to its counsellor or student record;
/// admin accounts have no subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UserAccount {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub user_id: EntityId,
    pub username: String,
    /// Salted SHA-256 digest; never the plaintext password.
    #[serde(skip_serializing)]
    pub password_digest: PasswordDigest,
    pub role: Role,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "uuid"))]
    pub subject_id: Option<EntityId>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
}
