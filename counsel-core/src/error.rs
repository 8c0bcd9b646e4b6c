//! Error types for Counselbase operations

use thiserror::Error;
use uuid::Uuid;

/// Entity type discriminator used in error payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    Student,
    Counsellor,
    AssignmentSlot,
    CounsellingSession,
    UserAccount,
}

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Entity not found: {entity_type:?} with id {id}")]
    NotFound { entity_type: EntityType, id: Uuid },

    #[error("Insert failed for {entity_type:?}: {reason}")]
    InsertFailed {
        entity_type: EntityType,
        reason: String,
    },

    #[error("Update failed for {entity_type:?} with id {id}: {reason}")]
    UpdateFailed {
        entity_type: EntityType,
        id: Uuid,
        reason: String,
    },

    /// No slot with this tuple exists for the requested counsellor.
    #[error("Counsellor {counsellor_id} has no slot for {slot_key}")]
    SlotMissing {
        counsellor_id: Uuid,
        slot_key: String,
    },

    /// The target slot is at max_students; no state was mutated.
    #[error("Slot {slot_id} is full ({max_students} students)")]
    CapacityExceeded { slot_id: Uuid, max_students: i32 },

    /// Two assignments in one submission share a slot key.
    #[error("Duplicate assignment for {slot_key} on counsellor {counsellor_id}")]
    DuplicateSlot {
        counsellor_id: Uuid,
        slot_key: String,
    },

    /// Removal or shrink refused because bound students still reference the slot.
    #[error("Slot {slot_id} still has {current_students} bound students")]
    SlotOccupied {
        slot_id: Uuid,
        current_students: i32,
    },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Constraint violation on {constraint}: {reason}")]
    ConstraintViolation { constraint: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Umbrella error for all Counselbase operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CounselError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type alias used throughout the core and storage crates.
pub type CounselResult<T> = Result<T, CounselError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_exceeded_display_names_the_slot() {
        let id = Uuid::now_v7();
        let err = StorageError::CapacityExceeded {
            slot_id: id,
            max_students: 30,
        };
        let text = err.to_string();
        assert!(text.contains(&id.to_string()));
        assert!(text.contains("30"));
    }

    #[test]
    fn umbrella_error_wraps_validation() {
        let err: CounselError = ValidationError::RequiredFieldMissing {
            field: "section".to_string(),
        }
        .into();
        assert!(matches!(err, CounselError::Validation(_)));
        assert!(err.to_string().contains("section"));
    }
}
