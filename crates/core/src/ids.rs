//! Identifier generation for new rows

use uuid::Uuid;

/// Time-ordered identifier for a new timesheet or entry.
#[must_use]
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}
