//! Counselbase Storage - Storage Trait and In-Memory Implementation
//!
//! Defines the storage abstraction for Counselbase entities. The REST layer
//! talks to `dyn Storage` only; `MemoryStorage` is the reference
//! implementation and doubles as the test fixture. A SQL-backed
//! implementation slots in behind the same trait.
//!
//! The bind, registration, and assignment-replacement operations are single
//! trait methods rather than get/put pairs so that every implementation owns
//! its transaction boundary: a failed bind must leave no partial mutation
//! behind, and two concurrent binds against one remaining seat must resolve
//! to exactly one success.

pub mod memory;

pub use memory::MemoryStorage;

use ::async_trait::async_trait;
use counsel_core::{
    AssignmentSlot, Counsellor, CounsellingSession, CounselResult, SlotKey, Student,
    StudentFilter, Timestamp, UserAccount,
};
use uuid::Uuid;

// ============================================================================
// UPDATE / SPEC TYPES
// ============================================================================

/// One requested assignment slot at counsellor registration or edit time.
/// Occupancy always starts at zero; it is never supplied by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSpec {
    pub key: SlotKey,
    pub max_students: i32,
}

/// Update payload for student profile fields.
///
/// The (year, semester, branch, section) tuple and the counsellor binding
/// are deliberately absent: those only move through `bind_student`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Update payload for counselling sessions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionUpdate {
    pub held_at: Option<Timestamp>,
    pub summary: Option<String>,
    pub follow_up: Option<Option<String>>,
}

// ============================================================================
// STORAGE TRAIT
// ============================================================================

/// Async storage trait for Counselbase entities.
///
/// Implementations must guarantee that `bind_student`,
/// `counsellor_register`, `replace_assignments`, and `counsellor_delete`
/// are atomic: either every mutation they describe lands, or none does.
#[async_trait]
pub trait Storage: Send + Sync {
    // ========================================================================
    // COUNSELLOR OPERATIONS
    // ========================================================================

    /// Register a counsellor together with their assignment slots.
    ///
    /// Each spec creates one slot with `current_students = 0`. Two specs
    /// sharing a slot key fail the whole registration with `DuplicateSlot`.
    async fn counsellor_register(
        &self,
        counsellor: &Counsellor,
        assignments: &[SlotSpec],
    ) -> CounselResult<Vec<AssignmentSlot>>;

    /// Get a counsellor by ID.
    async fn counsellor_get(&self, id: Uuid) -> CounselResult<Option<Counsellor>>;

    /// List all counsellors.
    async fn counsellor_list(&self) -> CounselResult<Vec<Counsellor>>;

    /// Update counsellor profile fields.
    async fn counsellor_update(&self, counsellor: &Counsellor) -> CounselResult<()>;

    /// Delete a counsellor and cascade-delete their slots.
    ///
    /// Refused with `SlotOccupied` while any slot still has bound students;
    /// a cascade here would strand those students' bindings.
    async fn counsellor_delete(&self, id: Uuid) -> CounselResult<()>;

    // ========================================================================
    // SLOT OPERATIONS
    // ========================================================================

    /// List the assignment slots owned by a counsellor.
    async fn slot_list_by_counsellor(
        &self,
        counsellor_id: Uuid,
    ) -> CounselResult<Vec<AssignmentSlot>>;

    /// Resolve every slot matching the full tuple, with its owning
    /// counsellor, sorted by ascending occupancy (least-loaded first).
    ///
    /// Full slots are included: the query is informational, and bind
    /// attempts against a full slot are rejected at bind time.
    async fn slot_query(
        &self,
        key: SlotKey,
    ) -> CounselResult<Vec<(AssignmentSlot, Counsellor)>>;

    /// Replace a counsellor's full assignment list.
    ///
    /// Slots whose key survives keep their identity and occupancy; their
    /// capacity may change but never below `current_students`. Removing a
    /// slot with bound students fails the whole operation with
    /// `SlotOccupied`.
    async fn replace_assignments(
        &self,
        counsellor_id: Uuid,
        assignments: &[SlotSpec],
    ) -> CounselResult<Vec<AssignmentSlot>>;

    // ========================================================================
    // BIND OPERATION
    // ========================================================================

    /// Bind a student to the slot identified by (counsellor_id, key).
    ///
    /// On success the student's tuple and counsellor binding are updated,
    /// the target slot's counter is incremented, and any differing prior
    /// slot's counter is decremented (floored at zero; a missing prior slot
    /// is a no-op). On `CapacityExceeded` no state changes at all.
    /// Rebinding to the already-held slot is an idempotent success.
    async fn bind_student(
        &self,
        student_id: Uuid,
        counsellor_id: Uuid,
        key: SlotKey,
    ) -> CounselResult<Student>;

    // ========================================================================
    // STUDENT OPERATIONS
    // ========================================================================

    /// Insert a new student (unbound).
    async fn student_insert(&self, student: &Student) -> CounselResult<()>;

    /// Get a student by ID.
    async fn student_get(&self, id: Uuid) -> CounselResult<Option<Student>>;

    /// List students matching the filter predicate.
    async fn student_list(&self, filter: &StudentFilter) -> CounselResult<Vec<Student>>;

    /// Update student profile fields. There is no student delete: records
    /// are retained for session history.
    async fn student_update(&self, id: Uuid, update: StudentUpdate) -> CounselResult<Student>;

    // ========================================================================
    // SESSION OPERATIONS
    // ========================================================================

    /// Insert a counselling session record.
    async fn session_insert(&self, session: &CounsellingSession) -> CounselResult<()>;

    /// Get a session by ID.
    async fn session_get(&self, id: Uuid) -> CounselResult<Option<CounsellingSession>>;

    /// List sessions for a student, newest first.
    async fn session_list_by_student(
        &self,
        student_id: Uuid,
    ) -> CounselResult<Vec<CounsellingSession>>;

    /// List sessions held by a counsellor, newest first.
    async fn session_list_by_counsellor(
        &self,
        counsellor_id: Uuid,
    ) -> CounselResult<Vec<CounsellingSession>>;

    /// Update a session record.
    async fn session_update(
        &self,
        id: Uuid,
        update: SessionUpdate,
    ) -> CounselResult<CounsellingSession>;

    // ========================================================================
    // USER ACCOUNT OPERATIONS
    // ========================================================================

    /// Insert a user account. Usernames are unique.
    async fn user_insert(&self, user: &UserAccount) -> CounselResult<()>;

    /// Get an account by ID.
    async fn user_get(&self, id: Uuid) -> CounselResult<Option<UserAccount>>;

    /// Get an account by username.
    async fn user_get_by_username(&self, username: &str) -> CounselResult<Option<UserAccount>>;
}
