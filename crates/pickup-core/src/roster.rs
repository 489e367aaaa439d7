//! Lane rosters: the set of entries waiting in one lane.
//!
//! The roster is a set under value equality stored as an append-ordered
//! list. `union` and `difference` are the only mutations, which makes
//! concurrent adds commute: any interleaving of unions ends in the same set.

use serde_json::Value;

use crate::{
    entry::QueueEntry,
    ids::{LaneId, ParentId},
    store::Document,
    Error, Result,
};

/// Array field holding the entries in a lane document.
pub const ROSTER_FIELD: &str = "students";

/// The entries currently waiting in one lane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneRoster {
    lane: LaneId,
    entries: Vec<QueueEntry>,
}

impl LaneRoster {
    /// Create an empty roster
    #[must_use]
    pub const fn new(lane: LaneId) -> Self {
        Self {
            lane,
            entries: Vec::new(),
        }
    }

    /// Lane this roster belongs to
    #[must_use]
    pub const fn lane(&self) -> &LaneId {
        &self.lane
    }

    /// Get the number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nobody is waiting
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get all entries in arrival order
    #[must_use]
    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    /// Append entries not already present. Returns how many were appended.
    pub fn union<'a>(&mut self, entries: impl IntoIterator<Item = &'a QueueEntry>) -> usize {
        let before = self.entries.len();
        for entry in entries {
            if !self.entries.contains(entry) {
                self.entries.push(entry.clone());
            }
        }
        self.entries.len() - before
    }

    /// Remove entries value-equal to any of `entries`. Returns how many were removed.
    pub fn difference<'a>(&mut self, entries: impl IntoIterator<Item = &'a QueueEntry>) -> usize {
        let doomed: Vec<&QueueEntry> = entries.into_iter().collect();
        let before = self.entries.len();
        self.entries.retain(|e| !doomed.contains(&e));
        before - self.entries.len()
    }

    /// Entries that belong to one parent
    #[must_use]
    pub fn entries_for_parent(&self, parent: &ParentId) -> Vec<&QueueEntry> {
        self.entries
            .iter()
            .filter(|e| &e.parent_id == parent)
            .collect()
    }

    /// Build a roster from a stored lane document. An absent document is an empty roster.
    pub fn from_document(lane: LaneId, doc: Option<&Document>) -> Result<Self> {
        let Some(doc) = doc else {
            return Ok(Self::new(lane));
        };

        let entries = match doc.get(ROSTER_FIELD) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| serde_json::from_value(item.clone()).map_err(Error::from))
                .collect::<Result<Vec<QueueEntry>>>()?,
            Some(other) => {
                return Err(Error::ParseError(format!(
                    "lane '{lane}' field '{ROSTER_FIELD}' is not an array: {other}"
                )))
            }
        };

        Ok(Self { lane, entries })
    }

    /// Render the roster as a lane document.
    pub fn to_document(&self) -> Result<Document> {
        let values = entries_to_values(&self.entries)?;
        let mut doc = Document::new();
        doc.insert(ROSTER_FIELD.to_string(), Value::Array(values));
        Ok(doc)
    }
}

/// Serialize entries to the JSON values the store compares.
pub fn entries_to_values(entries: &[QueueEntry]) -> Result<Vec<Value>> {
    entries
        .iter()
        .map(|e| serde_json::to_value(e).map_err(Error::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;

    use super::*;
    use crate::ids::StudentId;

    fn lane() -> LaneId {
        LaneId::parse("lane-1").expect("valid lane")
    }

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 14, 30, 0)
            .single()
            .expect("valid time")
    }

    fn entry(parent: &str, student: &str, offset_ms: i64) -> QueueEntry {
        QueueEntry::new(
            format!("Student {student}"),
            "2A",
            ParentId::parse(parent).expect("valid parent"),
            StudentId::parse(student).expect("valid student"),
            base_time() + Duration::milliseconds(offset_ms),
        )
    }

    #[test]
    fn test_union_deduplicates_by_value() {
        let mut roster = LaneRoster::new(lane());
        let a = entry("p1", "a", 0);
        let b = entry("p1", "b", 0);

        assert_eq!(roster.union([&a, &b]), 2);
        assert_eq!(roster.union([&a, &b]), 0);
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn test_union_keeps_arrival_order() {
        let mut roster = LaneRoster::new(lane());
        let a = entry("p1", "a", 0);
        let b = entry("p2", "b", 5);
        roster.union([&b]);
        roster.union([&a, &b]);
        assert_eq!(roster.entries(), &[b, a]);
    }

    #[test]
    fn test_difference_ignores_missing() {
        let mut roster = LaneRoster::new(lane());
        let a = entry("p1", "a", 0);
        let ghost = entry("p9", "z", 0);
        roster.union([&a]);

        assert_eq!(roster.difference([&ghost]), 0);
        assert_eq!(roster.difference([&a]), 1);
        assert!(roster.is_empty());
    }

    #[test]
    fn test_difference_with_rebuilt_timestamp_orphans_entry() {
        let mut roster = LaneRoster::new(lane());
        let original = entry("p1", "a", 0);
        let rebuilt = entry("p1", "a", 1);
        roster.union([&original]);

        assert_eq!(roster.difference([&rebuilt]), 0);
        assert!(roster.entries().contains(&original));
        assert_eq!(roster.entries_for_parent(&original.parent_id).len(), 1);
    }

    #[test]
    fn test_document_round_trip() -> Result<()> {
        let mut roster = LaneRoster::new(lane());
        roster.union([&entry("p1", "a", 0), &entry("p2", "b", 3)]);

        let doc = roster.to_document()?;
        let back = LaneRoster::from_document(lane(), Some(&doc))?;
        assert_eq!(back, roster);
        Ok(())
    }

    #[test]
    fn test_absent_document_is_empty_roster() -> Result<()> {
        let roster = LaneRoster::from_document(lane(), None)?;
        assert!(roster.is_empty());
        Ok(())
    }

    #[test]
    fn test_non_array_field_is_parse_error() {
        let mut doc = Document::new();
        doc.insert(ROSTER_FIELD.to_string(), Value::String("oops".into()));
        let result = LaneRoster::from_document(lane(), Some(&doc));
        assert!(matches!(result, Err(Error::ParseError(_))));
    }

    fn arb_entries() -> impl Strategy<Value = Vec<QueueEntry>> {
        prop::collection::vec((0u8..4, 0u8..6, 0i64..3), 0..12).prop_map(|raw| {
            raw.into_iter()
                .map(|(p, s, t)| entry(&format!("p{p}"), &format!("s{s}"), t))
                .collect()
        })
    }

    fn as_set(roster: &LaneRoster) -> std::collections::HashSet<QueueEntry> {
        roster.entries().iter().cloned().collect()
    }

    proptest! {
        /// Property: adding the same entries twice equals adding them once
        #[test]
        fn prop_union_is_idempotent(entries in arb_entries()) {
            let mut once = LaneRoster::new(lane());
            once.union(&entries);
            let mut twice = once.clone();
            twice.union(&entries);
            prop_assert_eq!(once, twice);
        }

        /// Property: union order does not change the resulting set
        #[test]
        fn prop_union_commutes(left in arb_entries(), right in arb_entries()) {
            let mut lr = LaneRoster::new(lane());
            lr.union(&left);
            lr.union(&right);
            let mut rl = LaneRoster::new(lane());
            rl.union(&right);
            rl.union(&left);
            prop_assert_eq!(as_set(&lr), as_set(&rl));
        }

        /// Property: no two value-equal entries are ever stored
        #[test]
        fn prop_no_duplicates(batches in prop::collection::vec(arb_entries(), 0..5)) {
            let mut roster = LaneRoster::new(lane());
            for batch in &batches {
                roster.union(batch);
            }
            prop_assert_eq!(as_set(&roster).len(), roster.len());
        }

        /// Property: removing what was added leaves none of it behind
        #[test]
        fn prop_difference_after_union_removes_all(
            existing in arb_entries(),
            added in arb_entries(),
        ) {
            let mut roster = LaneRoster::new(lane());
            roster.union(&existing);
            roster.union(&added);
            roster.difference(&added);
            prop_assert!(added.iter().all(|e| !roster.entries().contains(e)));
            prop_assert!(existing
                .iter()
                .filter(|e| !added.contains(e))
                .all(|e| roster.entries().contains(e)));
        }
    }
}
