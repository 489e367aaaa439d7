//! Queue entries: one student's presence in a lane queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    ids::{ParentId, StudentId},
    registry::StudentProfile,
};

/// A student waiting in a lane.
///
/// Entries are values: two entries are equal only when all five fields are
/// equal, including `enqueued_at`. Lanes remove entries by that equality, so
/// the exact value used when adding must be kept and passed back when
/// removing. An entry rebuilt with a fresh timestamp will not match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    /// Name shown to the staff calling students out
    pub student_display_name: String,
    /// Class section of the student
    pub section: String,
    /// Parent collecting the student
    pub parent_id: ParentId,
    /// Student being collected
    pub student_id: StudentId,
    /// When the parent confirmed arrival
    pub enqueued_at: DateTime<Utc>,
}

impl QueueEntry {
    /// Create a queue entry
    #[must_use]
    pub fn new(
        student_display_name: impl Into<String>,
        section: impl Into<String>,
        parent_id: ParentId,
        student_id: StudentId,
        enqueued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            student_display_name: student_display_name.into(),
            section: section.into(),
            parent_id,
            student_id,
            enqueued_at,
        }
    }

    /// One entry per student, all sharing `at`.
    #[must_use]
    pub fn for_students(
        parent: &ParentId,
        students: &[StudentProfile],
        at: DateTime<Utc>,
    ) -> Vec<Self> {
        students
            .iter()
            .map(|s| Self::new(&s.name, &s.section, parent.clone(), s.id.clone(), at))
            .collect()
    }
}
