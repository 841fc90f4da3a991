//! UUID helpers.
//!
//! All persisted entities use UUIDv7 so identifiers sort by creation
//! time, which keeps index pages hot and makes `ORDER BY id` equivalent
//! to `ORDER BY created_at`.

use uuid::Uuid;

/// Generate a new time-ordered UUIDv7.
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}

/// True if the UUID is version 7.
pub fn is_v7(id: &Uuid) -> bool {
    id.get_version_num() == 7
}
