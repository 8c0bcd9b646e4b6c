//! In-memory storage implementation.
//!
//! `MemoryStorage` keeps every table behind one `RwLock`. The bind path
//! spans the slot and student tables, so a single guard is what makes the
//! decrement / capacity-check / increment sequence one transaction: while a
//! writer holds the guard no other bind can interleave, which is the
//! in-memory analogue of the single-row transaction a SQL implementation
//! would use.

use std::collections::HashMap;
use std::sync::RwLock;

use ::async_trait::async_trait;
use counsel_core::{
    AssignmentSlot, Counsellor, CounsellingSession, CounselError, CounselResult, EntityType,
    SlotKey, StorageError, Student, StudentFilter, UserAccount,
};
use uuid::Uuid;

use crate::{SessionUpdate, SlotSpec, Storage, StudentUpdate};

#[derive(Debug, Default)]
struct StoreInner {
    counsellors: HashMap<Uuid, Counsellor>,
    slots: HashMap<Uuid, AssignmentSlot>,
    students: HashMap<Uuid, Student>,
    sessions: HashMap<Uuid, CounsellingSession>,
    users: HashMap<Uuid, UserAccount>,
}

impl StoreInner {
    /// Resolve a slot id by (counsellor, tuple).
    fn find_slot(&self, counsellor_id: Uuid, key: SlotKey) -> Option<Uuid> {
        self.slots
            .values()
            .find(|s| s.counsellor_id == counsellor_id && s.key() == key)
            .map(|s| s.slot_id)
    }
}

/// In-memory storage for Counselbase entities.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: RwLock<StoreInner>,
}

impl MemoryStorage {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> CounselResult<std::sync::RwLockReadGuard<'_, StoreInner>> {
        self.inner
            .read()
            .map_err(|_| CounselError::Storage(StorageError::LockPoisoned))
    }

    fn write(&self) -> CounselResult<std::sync::RwLockWriteGuard<'_, StoreInner>> {
        self.inner
            .write()
            .map_err(|_| CounselError::Storage(StorageError::LockPoisoned))
    }

    /// Count of stored assignment slots (test helper).
    pub fn slot_count(&self) -> usize {
        self.inner.read().map(|i| i.slots.len()).unwrap_or(0)
    }
}

/// Check a slot-spec list for duplicate tuples before any mutation.
fn reject_duplicate_keys(counsellor_id: Uuid, specs: &[SlotSpec]) -> CounselResult<()> {
    for (i, spec) in specs.iter().enumerate() {
        if specs[..i].iter().any(|prior| prior.key == spec.key) {
            return Err(CounselError::Storage(StorageError::DuplicateSlot {
                counsellor_id,
                slot_key: spec.key.to_string(),
            }));
        }
    }
    Ok(())
}

#[async_trait]
impl Storage for MemoryStorage {
    // === Counsellor Operations ===

    async fn counsellor_register(
        &self,
        counsellor: &Counsellor,
        assignments: &[SlotSpec],
    ) -> CounselResult<Vec<AssignmentSlot>> {
        reject_duplicate_keys(counsellor.counsellor_id, assignments)?;

        let mut inner = self.write()?;
        if inner.counsellors.contains_key(&counsellor.counsellor_id) {
            return Err(CounselError::Storage(StorageError::InsertFailed {
                entity_type: EntityType::Counsellor,
                reason: "already exists".to_string(),
            }));
        }

        let slots: Vec<AssignmentSlot> = assignments
            .iter()
            .map(|spec| AssignmentSlot {
                slot_id: counsel_core::new_entity_id(),
                counsellor_id: counsellor.counsellor_id,
                year: spec.key.year,
                semester: spec.key.semester,
                branch: spec.key.branch,
                section: spec.key.section,
                max_students: spec.max_students,
                current_students: 0,
                created_at: chrono::Utc::now(),
            })
            .collect();

        inner
            .counsellors
            .insert(counsellor.counsellor_id, counsellor.clone());
        for slot in &slots {
            inner.slots.insert(slot.slot_id, slot.clone());
        }
        Ok(slots)
    }

    async fn counsellor_get(&self, id: Uuid) -> CounselResult<Option<Counsellor>> {
        Ok(self.read()?.counsellors.get(&id).cloned())
    }

    async fn counsellor_list(&self) -> CounselResult<Vec<Counsellor>> {
        let mut all: Vec<Counsellor> = self.read()?.counsellors.values().cloned().collect();
        all.sort_by(|a, b| a.counsellor_id.cmp(&b.counsellor_id));
        Ok(all)
    }

    async fn counsellor_update(&self, counsellor: &Counsellor) -> CounselResult<()> {
        let mut inner = self.write()?;
        let existing = inner
            .counsellors
            .get_mut(&counsellor.counsellor_id)
            .ok_or(CounselError::Storage(StorageError::NotFound {
                entity_type: EntityType::Counsellor,
                id: counsellor.counsellor_id,
            }))?;
        *existing = counsellor.clone();
        Ok(())
    }

    async fn counsellor_delete(&self, id: Uuid) -> CounselResult<()> {
        let mut inner = self.write()?;
        if !inner.counsellors.contains_key(&id) {
            return Err(CounselError::Storage(StorageError::NotFound {
                entity_type: EntityType::Counsellor,
                id,
            }));
        }

        // Refuse the cascade while students are still bound to any slot.
        if let Some(occupied) = inner
            .slots
            .values()
            .find(|s| s.counsellor_id == id && s.current_students > 0)
        {
            return Err(CounselError::Storage(StorageError::SlotOccupied {
                slot_id: occupied.slot_id,
                current_students: occupied.current_students,
            }));
        }

        inner.counsellors.remove(&id);
        inner.slots.retain(|_, s| s.counsellor_id != id);
        Ok(())
    }

    // === Slot Operations ===

    async fn slot_list_by_counsellor(
        &self,
        counsellor_id: Uuid,
    ) -> CounselResult<Vec<AssignmentSlot>> {
        let mut slots: Vec<AssignmentSlot> = self
            .read()?
            .slots
            .values()
            .filter(|s| s.counsellor_id == counsellor_id)
            .cloned()
            .collect();
        slots.sort_by(|a, b| a.slot_id.cmp(&b.slot_id));
        Ok(slots)
    }

    async fn slot_query(
        &self,
        key: SlotKey,
    ) -> CounselResult<Vec<(AssignmentSlot, Counsellor)>> {
        let inner = self.read()?;
        let mut matches: Vec<(AssignmentSlot, Counsellor)> = inner
            .slots
            .values()
            .filter(|s| s.key() == key)
            .filter_map(|s| {
                inner
                    .counsellors
                    .get(&s.counsellor_id)
                    .map(|c| (s.clone(), c.clone()))
            })
            .collect();
        // Least-loaded counsellors first; full slots stay in the result.
        matches.sort_by_key(|(s, _)| (s.current_students, s.slot_id));
        Ok(matches)
    }

    async fn replace_assignments(
        &self,
        counsellor_id: Uuid,
        assignments: &[SlotSpec],
    ) -> CounselResult<Vec<AssignmentSlot>> {
        reject_duplicate_keys(counsellor_id, assignments)?;

        let mut inner = self.write()?;
        if !inner.counsellors.contains_key(&counsellor_id) {
            return Err(CounselError::Storage(StorageError::NotFound {
                entity_type: EntityType::Counsellor,
                id: counsellor_id,
            }));
        }

        let existing: Vec<AssignmentSlot> = inner
            .slots
            .values()
            .filter(|s| s.counsellor_id == counsellor_id)
            .cloned()
            .collect();

        // Validate everything before mutating anything.
        for slot in &existing {
            match assignments.iter().find(|spec| spec.key == slot.key()) {
                None if slot.current_students > 0 => {
                    return Err(CounselError::Storage(StorageError::SlotOccupied {
                        slot_id: slot.slot_id,
                        current_students: slot.current_students,
                    }));
                }
                Some(spec) if spec.max_students < slot.current_students => {
                    return Err(CounselError::Storage(StorageError::SlotOccupied {
                        slot_id: slot.slot_id,
                        current_students: slot.current_students,
                    }));
                }
                _ => {}
            }
        }

        let mut result = Vec::with_capacity(assignments.len());
        for spec in assignments {
            match existing.iter().find(|slot| slot.key() == spec.key) {
                Some(slot) => {
                    // Surviving slot: keep identity and occupancy.
                    let updated = AssignmentSlot {
                        max_students: spec.max_students,
                        ..slot.clone()
                    };
                    inner.slots.insert(updated.slot_id, updated.clone());
                    result.push(updated);
                }
                None => {
                    let slot = AssignmentSlot {
                        slot_id: counsel_core::new_entity_id(),
                        counsellor_id,
                        year: spec.key.year,
                        semester: spec.key.semester,
                        branch: spec.key.branch,
                        section: spec.key.section,
                        max_students: spec.max_students,
                        current_students: 0,
                        created_at: chrono::Utc::now(),
                    };
                    inner.slots.insert(slot.slot_id, slot.clone());
                    result.push(slot);
                }
            }
        }

        // Drop the (verified empty) slots whose key did not survive.
        let kept: Vec<Uuid> = result.iter().map(|s| s.slot_id).collect();
        inner
            .slots
            .retain(|id, s| s.counsellor_id != counsellor_id || kept.contains(id));

        Ok(result)
    }

    // === Bind Operation ===

    async fn bind_student(
        &self,
        student_id: Uuid,
        counsellor_id: Uuid,
        key: SlotKey,
    ) -> CounselResult<Student> {
        let mut inner = self.write()?;

        let student = inner.students.get(&student_id).cloned().ok_or(
            CounselError::Storage(StorageError::NotFound {
                entity_type: EntityType::Student,
                id: student_id,
            }),
        )?;

        let target_id = inner.find_slot(counsellor_id, key).ok_or_else(|| {
            CounselError::Storage(StorageError::SlotMissing {
                counsellor_id,
                slot_key: key.to_string(),
            })
        })?;

        // Prior slot, resolved from the student's stored binding. A missing
        // prior slot (deleted since the bind) is a no-op, not a failure.
        let prior_id = student
            .counsellor_id
            .and_then(|prior| inner.find_slot(prior, student.slot_key()));

        // Rebind to the currently-held slot: idempotent, no counter movement.
        if prior_id == Some(target_id) {
            return Ok(student);
        }

        // Capacity check before any mutation, so a failed bind never
        // detaches the student from their previous counsellor.
        {
            let target = &inner.slots[&target_id];
            if target.is_full() {
                return Err(CounselError::Storage(StorageError::CapacityExceeded {
                    slot_id: target_id,
                    max_students: target.max_students,
                }));
            }
        }

        if let Some(prior_id) = prior_id {
            if let Some(prior) = inner.slots.get_mut(&prior_id) {
                prior.current_students = (prior.current_students - 1).max(0);
            }
        }

        if let Some(target) = inner.slots.get_mut(&target_id) {
            target.current_students += 1;
        }

        let student = inner.students.get_mut(&student_id).ok_or(
            CounselError::Storage(StorageError::NotFound {
                entity_type: EntityType::Student,
                id: student_id,
            }),
        )?;
        student.counsellor_id = Some(counsellor_id);
        student.year = key.year;
        student.semester = key.semester;
        student.branch = key.branch;
        student.section = key.section;
        student.updated_at = chrono::Utc::now();
        Ok(student.clone())
    }

    // === Student Operations ===

    async fn student_insert(&self, student: &Student) -> CounselResult<()> {
        let mut inner = self.write()?;
        if inner.students.contains_key(&student.student_id) {
            return Err(CounselError::Storage(StorageError::InsertFailed {
                entity_type: EntityType::Student,
                reason: "already exists".to_string(),
            }));
        }
        if inner
            .students
            .values()
            .any(|s| s.roll_no == student.roll_no)
        {
            return Err(CounselError::Storage(StorageError::InsertFailed {
                entity_type: EntityType::Student,
                reason: format!("roll_no {} already registered", student.roll_no),
            }));
        }
        inner.students.insert(student.student_id, student.clone());
        Ok(())
    }

    async fn student_get(&self, id: Uuid) -> CounselResult<Option<Student>> {
        Ok(self.read()?.students.get(&id).cloned())
    }

    async fn student_list(&self, filter: &StudentFilter) -> CounselResult<Vec<Student>> {
        let mut students: Vec<Student> = self
            .read()?
            .students
            .values()
            .filter(|s| filter.year.map_or(true, |y| s.year == y))
            .filter(|s| filter.semester.map_or(true, |sem| s.semester == sem))
            .filter(|s| filter.branch.map_or(true, |b| s.branch == b))
            .filter(|s| filter.section.map_or(true, |sec| s.section == sec))
            .filter(|s| {
                filter
                    .counsellor_id
                    .map_or(true, |c| s.counsellor_id == Some(c))
            })
            .cloned()
            .collect();
        students.sort_by(|a, b| a.roll_no.cmp(&b.roll_no));
        Ok(students)
    }

    async fn student_update(&self, id: Uuid, update: StudentUpdate) -> CounselResult<Student> {
        let mut inner = self.write()?;
        let student =
            inner
                .students
                .get_mut(&id)
                .ok_or(CounselError::Storage(StorageError::NotFound {
                    entity_type: EntityType::Student,
                    id,
                }))?;
        if let Some(name) = update.name {
            student.name = name;
        }
        if let Some(email) = update.email {
            student.email = email;
        }
        student.updated_at = chrono::Utc::now();
        Ok(student.clone())
    }

    // === Session Operations ===

    async fn session_insert(&self, session: &CounsellingSession) -> CounselResult<()> {
        let mut inner = self.write()?;
        if inner.sessions.contains_key(&session.session_id) {
            return Err(CounselError::Storage(StorageError::InsertFailed {
                entity_type: EntityType::CounsellingSession,
                reason: "already exists".to_string(),
            }));
        }
        inner.sessions.insert(session.session_id, session.clone());
        Ok(())
    }

    async fn session_get(&self, id: Uuid) -> CounselResult<Option<CounsellingSession>> {
        Ok(self.read()?.sessions.get(&id).cloned())
    }

    async fn session_list_by_student(
        &self,
        student_id: Uuid,
    ) -> CounselResult<Vec<CounsellingSession>> {
        let mut sessions: Vec<CounsellingSession> = self
            .read()?
            .sessions
            .values()
            .filter(|s| s.student_id == student_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.held_at.cmp(&a.held_at));
        Ok(sessions)
    }

    async fn session_list_by_counsellor(
        &self,
        counsellor_id: Uuid,
    ) -> CounselResult<Vec<CounsellingSession>> {
        let mut sessions: Vec<CounsellingSession> = self
            .read()?
            .sessions
            .values()
            .filter(|s| s.counsellor_id == counsellor_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.held_at.cmp(&a.held_at));
        Ok(sessions)
    }

    async fn session_update(
        &self,
        id: Uuid,
        update: SessionUpdate,
    ) -> CounselResult<CounsellingSession> {
        let mut inner = self.write()?;
        let session =
            inner
                .sessions
                .get_mut(&id)
                .ok_or(CounselError::Storage(StorageError::NotFound {
                    entity_type: EntityType::CounsellingSession,
                    id,
                }))?;
        if let Some(held_at) = update.held_at {
            session.held_at = held_at;
        }
        if let Some(summary) = update.summary {
            session.summary = summary;
        }
        if let Some(follow_up) = update.follow_up {
            session.follow_up = follow_up;
        }
        session.updated_at = chrono::Utc::now();
        Ok(session.clone())
    }

    // === User Account Operations ===

    async fn user_insert(&self, user: &UserAccount) -> CounselResult<()> {
        let mut inner = self.write()?;
        if inner.users.contains_key(&user.user_id) {
            return Err(CounselError::Storage(StorageError::InsertFailed {
                entity_type: EntityType::UserAccount,
                reason: "already exists".to_string(),
            }));
        }
        if inner.users.values().any(|u| u.username == user.username) {
            return Err(CounselError::Storage(StorageError::InsertFailed {
                entity_type: EntityType::UserAccount,
                reason: format!("username {} already taken", user.username),
            }));
        }
        inner.users.insert(user.user_id, user.clone());
        Ok(())
    }

    async fn user_get(&self, id: Uuid) -> CounselResult<Option<UserAccount>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn user_get_by_username(&self, username: &str) -> CounselResult<Option<UserAccount>> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use counsel_core::{new_entity_id, Branch, Section};
    use std::sync::Arc;

    fn key(year: i16, semester: i16, branch: Branch, section: Section) -> SlotKey {
        SlotKey {
            year,
            semester,
            branch,
            section,
        }
    }

    fn cse_2_1_a() -> SlotKey {
        key(2, 1, Branch::Cse, Section::A)
    }

    fn counsellor(name: &str) -> Counsellor {
        let now = chrono::Utc::now();
        Counsellor {
            counsellor_id: new_entity_id(),
            name: name.to_string(),
            email: format!("{}@college.edu", name),
            phone: None,
            department: Some("CSE".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    fn student(roll_no: &str, slot: SlotKey) -> Student {
        let now = chrono::Utc::now();
        Student {
            student_id: new_entity_id(),
            roll_no: roll_no.to_string(),
            name: format!("Student {}", roll_no),
            email: format!("{}@college.edu", roll_no),
            year: slot.year,
            semester: slot.semester,
            branch: slot.branch,
            section: slot.section,
            counsellor_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn seed_counsellor(
        store: &MemoryStorage,
        specs: &[SlotSpec],
    ) -> (Counsellor, Vec<AssignmentSlot>) {
        let c = counsellor("mentor");
        let slots = store.counsellor_register(&c, specs).await.unwrap();
        (c, slots)
    }

    fn assert_capacity_invariant(slots: &[AssignmentSlot]) {
        for slot in slots {
            assert!(
                slot.current_students >= 0 && slot.current_students <= slot.max_students,
                "invariant violated on slot {}: {}/{}",
                slot.slot_id,
                slot.current_students,
                slot.max_students
            );
        }
    }

    #[tokio::test]
    async fn register_creates_independent_empty_slots() {
        let store = MemoryStorage::new();
        let specs = [
            SlotSpec {
                key: cse_2_1_a(),
                max_students: 30,
            },
            SlotSpec {
                key: key(3, 2, Branch::Ece, Section::B),
                max_students: 20,
            },
        ];
        let (_, slots) = seed_counsellor(&store, &specs).await;

        assert_eq!(slots.len(), 2);
        assert!(slots.iter().all(|s| s.current_students == 0));
        assert_eq!(store.slot_count(), 2);
    }

    #[tokio::test]
    async fn register_rejects_duplicate_slot_keys() {
        let store = MemoryStorage::new();
        let c = counsellor("mentor");
        let specs = [
            SlotSpec {
                key: cse_2_1_a(),
                max_students: 30,
            },
            SlotSpec {
                key: cse_2_1_a(),
                max_students: 10,
            },
        ];
        let err = store.counsellor_register(&c, &specs).await.unwrap_err();
        assert!(matches!(
            err,
            CounselError::Storage(StorageError::DuplicateSlot { .. })
        ));
        // Nothing was created.
        assert!(store.counsellor_get(c.counsellor_id).await.unwrap().is_none());
        assert_eq!(store.slot_count(), 0);
    }

    #[tokio::test]
    async fn bind_fills_slot_then_rejects_with_counters_unchanged() {
        // Spec scenario: (2,1,CSE,A, max=2) with one seat already taken.
        let store = MemoryStorage::new();
        let (c, _) = seed_counsellor(
            &store,
            &[SlotSpec {
                key: cse_2_1_a(),
                max_students: 2,
            }],
        )
        .await;

        let seeded = student("19CS001", cse_2_1_a());
        store.student_insert(&seeded).await.unwrap();
        store
            .bind_student(seeded.student_id, c.counsellor_id, cse_2_1_a())
            .await
            .unwrap();

        let x = student("19CS002", cse_2_1_a());
        store.student_insert(&x).await.unwrap();
        let bound = store
            .bind_student(x.student_id, c.counsellor_id, cse_2_1_a())
            .await
            .unwrap();
        assert_eq!(bound.counsellor_id, Some(c.counsellor_id));

        let slots = store.slot_list_by_counsellor(c.counsellor_id).await.unwrap();
        assert_eq!(slots[0].current_students, 2);

        let y = student("19CS003", cse_2_1_a());
        store.student_insert(&y).await.unwrap();
        let err = store
            .bind_student(y.student_id, c.counsellor_id, cse_2_1_a())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CounselError::Storage(StorageError::CapacityExceeded { .. })
        ));

        // Failure left every counter and the student untouched.
        let slots = store.slot_list_by_counsellor(c.counsellor_id).await.unwrap();
        assert_eq!(slots[0].current_students, 2);
        assert_capacity_invariant(&slots);
        let y_after = store.student_get(y.student_id).await.unwrap().unwrap();
        assert_eq!(y_after.counsellor_id, None);
    }

    #[tokio::test]
    async fn bind_unknown_student_errors_without_touching_counters() {
        let store = MemoryStorage::new();
        let (c, _) = seed_counsellor(
            &store,
            &[SlotSpec {
                key: cse_2_1_a(),
                max_students: 2,
            }],
        )
        .await;

        let err = store
            .bind_student(new_entity_id(), c.counsellor_id, cse_2_1_a())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CounselError::Storage(StorageError::NotFound { .. })
        ));

        let slots = store.slot_list_by_counsellor(c.counsellor_id).await.unwrap();
        assert_eq!(slots[0].current_students, 0);
    }

    #[tokio::test]
    async fn rebind_moves_one_seat_between_slots() {
        let store = MemoryStorage::new();
        let key_a = cse_2_1_a();
        let key_b = key(2, 2, Branch::Cse, Section::A);
        let (c, _) = seed_counsellor(
            &store,
            &[
                SlotSpec {
                    key: key_a,
                    max_students: 30,
                },
                SlotSpec {
                    key: key_b,
                    max_students: 30,
                },
            ],
        )
        .await;

        let s = student("19CS010", key_a);
        store.student_insert(&s).await.unwrap();
        store
            .bind_student(s.student_id, c.counsellor_id, key_a)
            .await
            .unwrap();

        // The update-semester flow: same counsellor, next semester's slot.
        let rebound = store
            .bind_student(s.student_id, c.counsellor_id, key_b)
            .await
            .unwrap();
        assert_eq!(rebound.semester, 2);
        assert_eq!(rebound.counsellor_id, Some(c.counsellor_id));

        let slots = store.slot_list_by_counsellor(c.counsellor_id).await.unwrap();
        let a = slots.iter().find(|s| s.key() == key_a).unwrap();
        let b = slots.iter().find(|s| s.key() == key_b).unwrap();
        assert_eq!(a.current_students, 0);
        assert_eq!(b.current_students, 1);
    }

    #[tokio::test]
    async fn rebind_to_held_slot_is_idempotent() {
        let store = MemoryStorage::new();
        let (c, _) = seed_counsellor(
            &store,
            &[SlotSpec {
                key: cse_2_1_a(),
                max_students: 1,
            }],
        )
        .await;

        let s = student("19CS011", cse_2_1_a());
        store.student_insert(&s).await.unwrap();
        store
            .bind_student(s.student_id, c.counsellor_id, cse_2_1_a())
            .await
            .unwrap();
        // Second identical bind: success, counter stays at 1 even though
        // the slot is now full.
        store
            .bind_student(s.student_id, c.counsellor_id, cse_2_1_a())
            .await
            .unwrap();

        let slots = store.slot_list_by_counsellor(c.counsellor_id).await.unwrap();
        assert_eq!(slots[0].current_students, 1);
    }

    #[tokio::test]
    async fn rebind_with_deleted_prior_slot_is_a_noop_decrement() {
        let store = MemoryStorage::new();
        let key_b = key(3, 1, Branch::Cse, Section::A);
        let (c1, _) = seed_counsellor(
            &store,
            &[SlotSpec {
                key: cse_2_1_a(),
                max_students: 5,
            }],
        )
        .await;
        let c2 = counsellor("second");
        store
            .counsellor_register(
                &c2,
                &[SlotSpec {
                    key: key_b,
                    max_students: 5,
                }],
            )
            .await
            .unwrap();

        let s = student("19CS012", cse_2_1_a());
        store.student_insert(&s).await.unwrap();
        store
            .bind_student(s.student_id, c1.counsellor_id, cse_2_1_a())
            .await
            .unwrap();

        // Unbind by hand and delete the prior counsellor, leaving the
        // student's stored binding dangling.
        {
            let mut inner = store.inner.write().unwrap();
            let slot_id = inner.find_slot(c1.counsellor_id, cse_2_1_a()).unwrap();
            inner.slots.get_mut(&slot_id).unwrap().current_students = 0;
        }
        store.counsellor_delete(c1.counsellor_id).await.unwrap();

        // Rebinding must succeed; the missing prior slot is skipped.
        let rebound = store
            .bind_student(s.student_id, c2.counsellor_id, key_b)
            .await
            .unwrap();
        assert_eq!(rebound.counsellor_id, Some(c2.counsellor_id));
        let slots = store.slot_list_by_counsellor(c2.counsellor_id).await.unwrap();
        assert_eq!(slots[0].current_students, 1);
        assert_capacity_invariant(&slots);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_binds_for_last_seat_admit_exactly_one() {
        let store = Arc::new(MemoryStorage::new());
        let (c, _) = seed_counsellor(
            &store,
            &[SlotSpec {
                key: cse_2_1_a(),
                max_students: 1,
            }],
        )
        .await;

        let x = student("19CS020", cse_2_1_a());
        let y = student("19CS021", cse_2_1_a());
        store.student_insert(&x).await.unwrap();
        store.student_insert(&y).await.unwrap();

        let mut handles = Vec::new();
        for id in [x.student_id, y.student_id] {
            let store = Arc::clone(&store);
            let counsellor_id = c.counsellor_id;
            handles.push(tokio::spawn(async move {
                store.bind_student(id, counsellor_id, cse_2_1_a()).await
            }));
        }

        let mut successes = 0;
        let mut capacity_failures = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(CounselError::Storage(StorageError::CapacityExceeded { .. })) => {
                    capacity_failures += 1
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(capacity_failures, 1);

        let slots = store.slot_list_by_counsellor(c.counsellor_id).await.unwrap();
        assert_eq!(slots[0].current_students, 1);
    }

    #[tokio::test]
    async fn replace_assignments_refuses_removing_occupied_slot() {
        let store = MemoryStorage::new();
        let key_b = key(3, 1, Branch::Ece, Section::B);
        let (c, _) = seed_counsellor(
            &store,
            &[
                SlotSpec {
                    key: cse_2_1_a(),
                    max_students: 5,
                },
                SlotSpec {
                    key: key_b,
                    max_students: 5,
                },
            ],
        )
        .await;

        let s = student("19CS030", cse_2_1_a());
        store.student_insert(&s).await.unwrap();
        store
            .bind_student(s.student_id, c.counsellor_id, cse_2_1_a())
            .await
            .unwrap();

        // Dropping the occupied CSE slot must fail the whole edit.
        let err = store
            .replace_assignments(
                c.counsellor_id,
                &[SlotSpec {
                    key: key_b,
                    max_students: 5,
                }],
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CounselError::Storage(StorageError::SlotOccupied { .. })
        ));
        // Both slots are still there, counters intact.
        let slots = store.slot_list_by_counsellor(c.counsellor_id).await.unwrap();
        assert_eq!(slots.len(), 2);
        assert_eq!(
            slots.iter().map(|s| s.current_students).sum::<i32>(),
            1
        );
    }

    #[tokio::test]
    async fn replace_assignments_keeps_surviving_slot_occupancy() {
        let store = MemoryStorage::new();
        let (c, _) = seed_counsellor(
            &store,
            &[SlotSpec {
                key: cse_2_1_a(),
                max_students: 5,
            }],
        )
        .await;
        let s = student("19CS031", cse_2_1_a());
        store.student_insert(&s).await.unwrap();
        store
            .bind_student(s.student_id, c.counsellor_id, cse_2_1_a())
            .await
            .unwrap();

        // Raise capacity and add a fresh slot in one edit.
        let slots = store
            .replace_assignments(
                c.counsellor_id,
                &[
                    SlotSpec {
                        key: cse_2_1_a(),
                        max_students: 10,
                    },
                    SlotSpec {
                        key: key(4, 1, Branch::Cse, Section::A),
                        max_students: 8,
                    },
                ],
            )
            .await
            .unwrap();

        let survived = slots.iter().find(|s| s.key() == cse_2_1_a()).unwrap();
        assert_eq!(survived.current_students, 1);
        assert_eq!(survived.max_students, 10);
        let fresh = slots.iter().find(|s| s.key() != cse_2_1_a()).unwrap();
        assert_eq!(fresh.current_students, 0);
    }

    #[tokio::test]
    async fn replace_assignments_refuses_shrink_below_occupancy() {
        let store = MemoryStorage::new();
        let (c, _) = seed_counsellor(
            &store,
            &[SlotSpec {
                key: cse_2_1_a(),
                max_students: 2,
            }],
        )
        .await;
        for roll in ["19CS040", "19CS041"] {
            let s = student(roll, cse_2_1_a());
            store.student_insert(&s).await.unwrap();
            store
                .bind_student(s.student_id, c.counsellor_id, cse_2_1_a())
                .await
                .unwrap();
        }

        let err = store
            .replace_assignments(
                c.counsellor_id,
                &[SlotSpec {
                    key: cse_2_1_a(),
                    max_students: 1,
                }],
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CounselError::Storage(StorageError::SlotOccupied { .. })
        ));
    }

    #[tokio::test]
    async fn counsellor_delete_refused_while_students_bound() {
        let store = MemoryStorage::new();
        let (c, _) = seed_counsellor(
            &store,
            &[SlotSpec {
                key: cse_2_1_a(),
                max_students: 5,
            }],
        )
        .await;
        let s = student("19CS050", cse_2_1_a());
        store.student_insert(&s).await.unwrap();
        store
            .bind_student(s.student_id, c.counsellor_id, cse_2_1_a())
            .await
            .unwrap();

        let err = store.counsellor_delete(c.counsellor_id).await.unwrap_err();
        assert!(matches!(
            err,
            CounselError::Storage(StorageError::SlotOccupied { .. })
        ));
        assert!(store
            .counsellor_get(c.counsellor_id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn slot_query_orders_by_occupancy_and_keeps_full_slots() {
        let store = MemoryStorage::new();
        let busy = counsellor("busy");
        let idle = counsellor("idle");
        store
            .counsellor_register(
                &busy,
                &[SlotSpec {
                    key: cse_2_1_a(),
                    max_students: 1,
                }],
            )
            .await
            .unwrap();
        store
            .counsellor_register(
                &idle,
                &[SlotSpec {
                    key: cse_2_1_a(),
                    max_students: 5,
                }],
            )
            .await
            .unwrap();

        let s = student("19CS060", cse_2_1_a());
        store.student_insert(&s).await.unwrap();
        store
            .bind_student(s.student_id, busy.counsellor_id, cse_2_1_a())
            .await
            .unwrap();

        let matches = store.slot_query(cse_2_1_a()).await.unwrap();
        // The full slot is still listed, after the empty one.
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].1.counsellor_id, idle.counsellor_id);
        assert_eq!(matches[1].1.counsellor_id, busy.counsellor_id);
        assert!(matches[1].0.is_full());

        // No match for a different tuple.
        let other = store
            .slot_query(key(1, 1, Branch::Mech, Section::D))
            .await
            .unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn student_list_applies_server_side_predicate() {
        let store = MemoryStorage::new();
        store
            .student_insert(&student("19CS070", cse_2_1_a()))
            .await
            .unwrap();
        store
            .student_insert(&student("19EC071", key(2, 1, Branch::Ece, Section::A)))
            .await
            .unwrap();

        let filter = StudentFilter {
            branch: Some(Branch::Cse),
            ..Default::default()
        };
        let cse = store.student_list(&filter).await.unwrap();
        assert_eq!(cse.len(), 1);
        assert_eq!(cse[0].roll_no, "19CS070");

        let all = store.student_list(&StudentFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn duplicate_roll_no_and_username_rejected() {
        let store = MemoryStorage::new();
        store
            .student_insert(&student("19CS080", cse_2_1_a()))
            .await
            .unwrap();
        let err = store
            .student_insert(&student("19CS080", cse_2_1_a()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CounselError::Storage(StorageError::InsertFailed { .. })
        ));

        let now = chrono::Utc::now();
        let account = |username: &str| UserAccount {
            user_id: new_entity_id(),
            username: username.to_string(),
            password_digest: "digest".to_string(),
            role: counsel_core::Role::Student,
            subject_id: None,
            created_at: now,
        };
        store.user_insert(&account("alice")).await.unwrap();
        assert!(store.user_insert(&account("alice")).await.is_err());
        assert!(store
            .user_get_by_username("alice")
            .await
            .unwrap()
            .is_some());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        // Property 1: current_students <= max_students holds after every
        // bind call, success or failure, for any interleaving of binds and
        // rebinds across two slots.
        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]
            #[test]
            fn capacity_invariant_under_arbitrary_bind_sequences(
                max_a in 1..4i32,
                max_b in 1..4i32,
                ops in proptest::collection::vec((0..6usize, proptest::bool::ANY), 1..40),
            ) {
                let rt = tokio::runtime::Builder::new_current_thread()
                    .build()
                    .unwrap();
                rt.block_on(async move {
                    let store = MemoryStorage::new();
                    let key_a = cse_2_1_a();
                    let key_b = key(3, 1, Branch::Cse, Section::A);
                    let (c, _) = seed_counsellor(
                        &store,
                        &[
                            SlotSpec { key: key_a, max_students: max_a },
                            SlotSpec { key: key_b, max_students: max_b },
                        ],
                    )
                    .await;

                    let students: Vec<Student> = (0..6)
                        .map(|i| student(&format!("19CS9{:02}", i), key_a))
                        .collect();
                    for s in &students {
                        store.student_insert(s).await.unwrap();
                    }

                    for (idx, to_a) in ops {
                        let target = if to_a { key_a } else { key_b };
                        // Success or CapacityExceeded are both fine here;
                        // only the invariant matters.
                        let _ = store
                            .bind_student(students[idx].student_id, c.counsellor_id, target)
                            .await;
                        let slots =
                            store.slot_list_by_counsellor(c.counsellor_id).await.unwrap();
                        assert_capacity_invariant(&slots);
                    }
                });
            }
        }
    }
}
