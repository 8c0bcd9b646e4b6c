//! Assignment Service
//!
//! Validation for assignment submissions, extracted from the counsellor
//! routes. The capacity arithmetic itself lives in the storage transaction;
//! this layer rejects malformed submissions before they reach storage.

use std::collections::HashSet;

use counsel_core::SlotKey;
use counsel_storage::SlotSpec;

use crate::error::{ApiError, ApiResult};
use crate::types::AssignmentSpecRequest;
use crate::validation::ValidateRange;

/// Validate an assignment submission and convert it to storage slot specs.
///
/// Checks, per slot: `year` in 1-4, `semester` in 1-2, `max_students >= 1`.
/// Across the submission: no two slots may share a
/// (year, semester, branch, section) tuple.
///
/// # Errors
/// - `InvalidRange` for an out-of-range field
/// - `DuplicateSlot` when two entries share a tuple
pub fn validate_assignment_specs(
    assignments: &[AssignmentSpecRequest],
) -> ApiResult<Vec<SlotSpec>> {
    let mut seen: HashSet<SlotKey> = HashSet::new();
    let mut specs = Vec::with_capacity(assignments.len());

    for assignment in assignments {
        assignment.year.validate_range("year", 1, 4)?;
        assignment.semester.validate_range("semester", 1, 2)?;
        assignment.max_students.validate_positive("max_students")?;

        let key = assignment.key();
        if !seen.insert(key) {
            return Err(ApiError::new(
                crate::error::ErrorCode::DuplicateSlot,
                format!("Assignment slot {} appears more than once", key),
            ));
        }

        specs.push(SlotSpec {
            key,
            max_students: assignment.max_students,
        });
    }

    Ok(specs)
}

/// Validate the slot tuple of a bind request.
pub fn validate_slot_key(key: &SlotKey) -> ApiResult<()> {
    key.year.validate_range("year", 1, 4)?;
    key.semester.validate_range("semester", 1, 2)?;
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
