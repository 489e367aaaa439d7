//! Lane queue coordinator.
//!
//! Owns every write to the shared per-lane roster documents. Concurrent
//! parents on different devices may add to and remove from the same lane at
//! the same time; correctness rests on the store's per-document union and
//! difference primitives rather than on locks or version checks:
//!
//! - `add` is idempotent and commutes with other adds.
//! - `remove` deletes exactly the value-equal entries and ignores the rest.
//!
//! The coordinator never overwrites a roster as a whole. The only full write
//! is the initial `create_document`, which fails instead of overwriting when
//! another writer created the lane first; the loser then falls back to a
//! union.

use std::sync::Arc;

use crate::{
    entry::QueueEntry,
    ids::LaneId,
    roster::{entries_to_values, LaneRoster, ROSTER_FIELD},
    store::DocumentStore,
    Error, Result,
};

/// Collection holding one document per lane.
pub const LANE_COLLECTION: &str = "pickup_queue";

/// Coordinates shared lane rosters.
#[derive(Clone)]
pub struct LaneCoordinator {
    store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for LaneCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaneCoordinator").finish_non_exhaustive()
    }
}

impl LaneCoordinator {
    /// Create a coordinator over a document store
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Add entries to a lane, creating the lane document on first use.
    ///
    /// Entries already present by value are not duplicated, so calling this
    /// twice with the same entries is a no-op the second time.
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailed` if `entries` is empty and
    /// `StoreUnavailable` if the write cannot complete.
    pub async fn add(&self, lane: &LaneId, entries: &[QueueEntry]) -> Result<()> {
        require_entries(lane, entries)?;

        let existing = self
            .store
            .get_document(LANE_COLLECTION, lane.as_str())
            .await?;

        if existing.is_none() {
            let mut roster = LaneRoster::new(lane.clone());
            roster.union(entries);
            match self
                .store
                .create_document(LANE_COLLECTION, lane.as_str(), roster.to_document()?)
                .await
            {
                Ok(()) => {
                    tracing::info!(lane = %lane, count = roster.len(), "lane created");
                    return Ok(());
                }
                Err(Error::Conflict(_)) => {
                    tracing::warn!(lane = %lane, "lane created concurrently, merging instead");
                }
                Err(e) => return Err(e),
            }
        }

        self.store
            .union_update(
                LANE_COLLECTION,
                lane.as_str(),
                ROSTER_FIELD,
                entries_to_values(entries)?,
            )
            .await?;
        tracing::info!(lane = %lane, count = entries.len(), "entries added to lane");
        Ok(())
    }

    /// Remove exactly the entries value-equal to `entries`.
    ///
    /// Entries that are not present are ignored, so a retried removal is
    /// harmless. An entry rebuilt with a different `enqueued_at` does not
    /// match and stays in the lane; callers must pass the values they added.
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailed` if `entries` is empty and
    /// `StoreUnavailable` if the write cannot complete.
    pub async fn remove(&self, lane: &LaneId, entries: &[QueueEntry]) -> Result<()> {
        require_entries(lane, entries)?;

        self.store
            .difference_update(
                LANE_COLLECTION,
                lane.as_str(),
                ROSTER_FIELD,
                entries_to_values(entries)?,
            )
            .await?;
        tracing::info!(lane = %lane, count = entries.len(), "entries removed from lane");
        Ok(())
    }

    /// Current roster of a lane. A lane nobody has used yet is empty.
    pub async fn roster(&self, lane: &LaneId) -> Result<LaneRoster> {
        let doc = self
            .store
            .get_document(LANE_COLLECTION, lane.as_str())
            .await?;
        LaneRoster::from_document(lane.clone(), doc.as_ref())
    }
}

fn require_entries(lane: &LaneId, entries: &[QueueEntry]) -> Result<()> {
    if entries.is_empty() {
        return Err(Error::validation(format!(
            "no queue entries given for {}",
            lane.display_name()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::{
        ids::{ParentId, StudentId},
        store::MemoryStore,
    };

    fn setup() -> (Arc<MemoryStore>, LaneCoordinator) {
        let store = Arc::new(MemoryStore::new());
        let coordinator = LaneCoordinator::new(store.clone());
        (store, coordinator)
    }

    fn lane() -> LaneId {
        LaneId::parse("lane-1").expect("valid lane")
    }

    fn entries(parent: &str, students: &[&str]) -> Vec<QueueEntry> {
        let at = Utc::now();
        students
            .iter()
            .map(|s| {
                QueueEntry::new(
                    format!("Student {s}"),
                    "4C",
                    ParentId::parse(parent).expect("valid parent"),
                    StudentId::parse(*s).expect("valid student"),
                    at,
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_add_creates_lane_document() -> Result<()> {
        let (store, coordinator) = setup();
        coordinator.add(&lane(), &entries("p1", &["a", "b"])).await?;

        assert_eq!(store.count(LANE_COLLECTION).await, 1);
        assert_eq!(coordinator.roster(&lane()).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_is_idempotent() -> Result<()> {
        let (_, coordinator) = setup();
        let batch = entries("p1", &["a", "b"]);
        coordinator.add(&lane(), &batch).await?;
        coordinator.add(&lane(), &batch).await?;

        assert_eq!(coordinator.roster(&lane()).await?.entries(), batch.as_slice());
        Ok(())
    }

    #[tokio::test]
    async fn test_add_deduplicates_within_first_batch() -> Result<()> {
        let (_, coordinator) = setup();
        let mut batch = entries("p1", &["a"]);
        batch.extend(batch.clone());
        coordinator.add(&lane(), &batch).await?;

        assert_eq!(coordinator.roster(&lane()).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_empty_is_rejected() {
        let (store, coordinator) = setup();
        let result = coordinator.add(&lane(), &[]).await;
        assert!(matches!(result, Err(Error::ValidationFailed(_))));
        assert_eq!(store.count(LANE_COLLECTION).await, 0);
    }

    #[tokio::test]
    async fn test_remove_exact_entries() -> Result<()> {
        let (_, coordinator) = setup();
        let mine = entries("p1", &["a", "b"]);
        let theirs = entries("p2", &["c"]);
        coordinator.add(&lane(), &mine).await?;
        coordinator.add(&lane(), &theirs).await?;

        coordinator.remove(&lane(), &mine).await?;
        assert_eq!(coordinator.roster(&lane()).await?.entries(), theirs.as_slice());
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_absent_is_noop() -> Result<()> {
        let (_, coordinator) = setup();
        coordinator.remove(&lane(), &entries("p1", &["a"])).await?;
        assert!(coordinator.roster(&lane()).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_emptied_lane_keeps_its_document() -> Result<()> {
        let (store, coordinator) = setup();
        let batch = entries("p1", &["a"]);
        coordinator.add(&lane(), &batch).await?;
        coordinator.remove(&lane(), &batch).await?;

        assert_eq!(store.count(LANE_COLLECTION).await, 1);
        assert!(coordinator.roster(&lane()).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_with_rebuilt_entries_leaves_orphans() -> Result<()> {
        let (_, coordinator) = setup();
        let added = entries("p1", &["a"]);
        coordinator.add(&lane(), &added).await?;

        let rebuilt: Vec<QueueEntry> = added
            .iter()
            .cloned()
            .map(|mut e| {
                e.enqueued_at += Duration::microseconds(1);
                e
            })
            .collect();
        coordinator.remove(&lane(), &rebuilt).await?;

        let roster = coordinator.roster(&lane()).await?;
        assert_eq!(roster.entries(), added.as_slice());
        Ok(())
    }

    #[tokio::test]
    async fn test_lanes_are_independent() -> Result<()> {
        let (_, coordinator) = setup();
        let other = LaneId::parse("lane-2")?;
        coordinator.add(&lane(), &entries("p1", &["a"])).await?;
        coordinator.add(&other, &entries("p2", &["b"])).await?;

        assert_eq!(coordinator.roster(&lane()).await?.len(), 1);
        assert_eq!(coordinator.roster(&other).await?.len(), 1);
        Ok(())
    }
}
