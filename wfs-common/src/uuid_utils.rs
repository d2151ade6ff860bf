//! UUID utilities

use uuid::Uuid;

/// Generate a new UUIDv4
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Generate a new UUIDv4 in hyphenated text form (record ids, request ids)
pub fn generate_id() -> String {
    generate().hyphenated().to_string()
}
