//! Lessons and lesson lifecycle events
//!
//! Lessons are owned by the scheduling service; this crate only sees them
//! through events and a read model used for status validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::impl_domain_status_conversions;
use crate::utils::calendar::BusinessCalendar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LessonSchedulingStatus {
    Draft,
    Published,
    Completed,
    Canceled,
}

impl_domain_status_conversions!(LessonSchedulingStatus {
    Draft => "LESSON_SCHEDULING_STATUS_DRAFT",
    Published => "LESSON_SCHEDULING_STATUS_PUBLISHED",
    Completed => "LESSON_SCHEDULING_STATUS_COMPLETED",
    Canceled => "LESSON_SCHEDULING_STATUS_CANCELED",
});

impl LessonSchedulingStatus {
    /// A lesson in this status may back a submitted timesheet.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        matches!(self, Self::Completed | Self::Canceled)
    }
}

/// Lesson as published by the scheduling service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub lesson_id: String,
    pub location_id: String,
    /// UTC instant; the timesheet date is its business-local date.
    pub start_time: DateTime<Utc>,
    pub scheduling_status: LessonSchedulingStatus,
    /// Live teachers only; absent in the payload means none.
    #[serde(default)]
    pub teacher_ids: Vec<String>,
}

impl Lesson {
    /// Only published lessons with at least one teacher produce timesheets.
    #[must_use]
    pub fn is_eligible_for_timesheet(&self) -> bool {
        self.scheduling_status == LessonSchedulingStatus::Published && !self.teacher_ids.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonCreated {
    pub lessons: Vec<Lesson>,
}

/// Full lesson state on both sides of an edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonUpdated {
    pub before: Lesson,
    pub after: Lesson,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonDeleted {
    pub lesson_ids: Vec<String>,
}

/// Inbound lesson lifecycle event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload")]
pub enum LessonEvent {
    Created(LessonCreated),
    Updated(LessonUpdated),
    Deleted(LessonDeleted),
}

/// One reason a lesson update touches timesheets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LessonUpdateKind {
    PublishedToDraft,
    DraftToPublished,
    TeachersChanged { added: Vec<String>, removed: Vec<String> },
    DateChanged,
    StartTimeChanged,
    LocationChanged,
}

impl LessonUpdated {
    #[must_use]
    pub fn lesson_id(&self) -> &str {
        &self.after.lesson_id
    }

    /// Categories that apply to this update, in processing order.
    ///
    /// Categories are not exclusive, except that a start-time change is
    /// only reported when the business date stayed the same.
    #[must_use]
    pub fn classify(&self, calendar: &BusinessCalendar) -> Vec<LessonUpdateKind> {
        use LessonSchedulingStatus::{Draft, Published};

        let (before, after) = (&self.before, &self.after);
        let mut kinds = Vec::new();

        if before.scheduling_status == Published && after.scheduling_status == Draft {
            kinds.push(LessonUpdateKind::PublishedToDraft);
        }
        if before.scheduling_status == Draft && after.scheduling_status == Published {
            kinds.push(LessonUpdateKind::DraftToPublished);
        }
        if after.scheduling_status == Draft {
            return kinds;
        }

        let added = difference(&after.teacher_ids, &before.teacher_ids);
        let removed = difference(&before.teacher_ids, &after.teacher_ids);
        if !added.is_empty() || !removed.is_empty() {
            kinds.push(LessonUpdateKind::TeachersChanged { added, removed });
        }

        if calendar.date_of(before.start_time) != calendar.date_of(after.start_time) {
            kinds.push(LessonUpdateKind::DateChanged);
        } else if before.start_time != after.start_time {
            kinds.push(LessonUpdateKind::StartTimeChanged);
        }

        if before.location_id != after.location_id {
            kinds.push(LessonUpdateKind::LocationChanged);
        }
        kinds
    }
}

/// Set difference `left - right`, deduplicated, in `left` order.
fn difference(left: &[String], right: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for id in left {
        if !right.contains(id) && !out.contains(id) {
            out.push(id.clone());
        }
    }
    out
}
