//! Counselbase Core - Domain Types
//!
//! Core data types for the college counselling management backend:
//! entities (students, counsellors, assignment slots, sessions, accounts),
//! enums (branch, section, role), filter tuples, and domain error types.
//!
//! The storage abstraction lives in counsel-storage; the REST layer in
//! counsel-api. This crate has no I/O.

pub mod entities;
pub mod enums;
pub mod error;
pub mod filter;
pub mod identity;

pub use entities::{
    AssignmentSlot, Counsellor, CounsellingSession, Student, UserAccount,
};
pub use enums::{Branch, Role, Section};
pub use error::{
    ConfigError, CounselError, CounselResult, EntityType, StorageError, ValidationError,
};
pub use filter::{SlotKey, StudentFilter};
pub use identity::{
    hash_password, new_entity_id, verify_password, EntityId, PasswordDigest, Timestamp,
};
