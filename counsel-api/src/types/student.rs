//! Student-related API types

use counsel_core::{Branch, EntityId, Section, Student, StudentFilter, Timestamp};
use serde::{Deserialize, Serialize};

/// Request to create a new student record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CreateStudentRequest {
    /// Institutional roll number, unique across students
    pub roll_no: String,
    pub name: String,
    pub email: String,
    /// Year of study (1-4)
    pub year: i16,
    /// Semester within the year (1-2)
    pub semester: i16,
    pub branch: Branch,
    pub section: Section,
}

/// Request to update a student's profile fields.
///
/// The counsellor binding is not editable here; it only changes through the
/// bind operation so slot counters stay consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UpdateStudentRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Query parameters for listing students.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ListStudentsQuery {
    pub year: Option<i16>,
    pub semester: Option<i16>,
    pub branch: Option<Branch>,
    pub section: Option<Section>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub counsellor_id: Option<EntityId>,
}

impl From<ListStudentsQuery> for StudentFilter {
    fn from(query: ListStudentsQuery) -> Self {
        StudentFilter {
            year: query.year,
            semester: query.semester,
            branch: query.branch,
            section: query.section,
            counsellor_id: query.counsellor_id,
        }
    }
}

/// Response containing a list of students.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ListStudentsResponse {
    pub students: Vec<StudentResponse>,
    pub total: i32,
}

/// Student record with full details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct StudentResponse {
    #[schema(value_type = String, format = "uuid")]
    pub student_id: EntityId,
    pub roll_no: String,
    pub name: String,
    pub email: String,
    pub year: i16,
    pub semester: i16,
    pub branch: Branch,
    pub section: Section,
    /// Currently bound counsellor, if any
    #[schema(value_type = Option<String>, format = "uuid")]
    pub counsellor_id: Option<EntityId>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: Timestamp,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: Timestamp,
}

impl From<Student> for StudentResponse {
    fn from(student: Student) -> Self {
        Self {
            student_id: student.student_id,
            roll_no: student.roll_no,
            name: student.name,
            email: student.email,
            year: student.year,
            semester: student.semester,
            branch: student.branch,
            section: student.section,
            counsellor_id: student.counsellor_id,
            created_at: student.created_at,
            updated_at: student.updated_at,
        }
    }
}
