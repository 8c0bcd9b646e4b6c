//! Filter tuples shared by the storage layer and the REST layer.

use crate::{Branch, EntityId, Section, ValidationError};
use serde::{Deserialize, Serialize};

/// The four-field tuple that identifies an assignment slot within a
/// counsellor: (year, semester, branch, section).
///
/// All four fields are required; partial tuples never reach the storage
/// layer because deserialization fails on a missing field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SlotKey {
    /// Academic year, 1 through 4.
    pub year: i16,
    /// Semester within the year, 1 or 2.
    pub semester: i16,
    pub branch: Branch,
    pub section: Section,
}

impl SlotKey {
    /// Validate the numeric fields of the tuple.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=4).contains(&self.year) {
            return Err(ValidationError::InvalidValue {
                field: "year".to_string(),
                reason: format!("must be 1-4, got {}", self.year),
            });
        }
        if !(1..=2).contains(&self.semester) {
            return Err(ValidationError::InvalidValue {
                field: "semester".to_string(),
                reason: format!("must be 1-2, got {}", self.semester),
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for SlotKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{}/{}/{}",
            self.year, self.semester, self.branch, self.section
        )
    }
}

/// Optional predicate for listing students.
///
/// Every populated field narrows the result; the predicate is applied by
/// the storage implementation, not by callers over a full-table fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StudentFilter {
    pub year: Option<i16>,
    pub semester: Option<i16>,
    pub branch: Option<Branch>,
    pub section: Option<Section>,
    /// Restrict to students bound to this counsellor.
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "uuid"))]
    pub counsellor_id: Option<EntityId>,
}

impl StudentFilter {
    /// True when no field narrows the result.
    pub fn is_empty(&self) -> bool {
        self.year.is_none()
            && self.semester.is_none()
            && self.branch.is_none()
            && self.section.is_none()
            && self.counsellor_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(year: i16, semester: i16) -> SlotKey {
        SlotKey {
            year,
            semester,
            branch: Branch::Cse,
            section: Section::A,
        }
    }

    #[test]
    fn slot_key_validates_ranges() {
        assert!(key(1, 1).validate().is_ok());
        assert!(key(4, 2).validate().is_ok());
        assert!(key(0, 1).validate().is_err());
        assert!(key(5, 1).validate().is_err());
        assert!(key(2, 3).validate().is_err());
    }

    #[test]
    fn slot_key_rejects_missing_fields_on_deserialize() {
        let partial = serde_json::json!({ "year": 2, "semester": 1, "branch": "CSE" });
        assert!(serde_json::from_value::<SlotKey>(partial).is_err());
    }

    #[test]
    fn student_filter_default_is_empty() {
        assert!(StudentFilter::default().is_empty());
        let filter = StudentFilter {
            branch: Some(Branch::Ece),
            ..Default::default()
        };
        assert!(!filter.is_empty());
    }
}
