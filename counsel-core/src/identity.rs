//! Identity types for Counselbase entities

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Entity identifier using UUIDv7 for timestamp-sortable IDs.
/// UUIDv7 embeds a Unix timestamp, making IDs naturally sortable by creation time.
pub type EntityId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Hex-encoded SHA-256 password digest.
pub type PasswordDigest = String;

/// Generate a new UUIDv7 EntityId (timestamp-sortable).
pub fn new_entity_id() -> EntityId {
    Uuid::now_v7()
}

/// Compute the digest stored for a user account password.
///
/// The password is salted with the account's user id so identical passwords
/// across accounts produce distinct digests.
pub fn hash_password(user_id: EntityId, password: &str) -> PasswordDigest {
    let mut hasher = Sha256::new();
    hasher.update(user_id.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Check a candidate password against a stored digest.
pub fn verify_password(user_id: EntityId, password: &str, digest: &str) -> bool {
    hash_password(user_id, password) == digest
}
