//! Shared helpers for pickup-core integration tests.

#![allow(dead_code, clippy::expect_used)]

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pickup_core::{
    coordinator::LANE_COLLECTION, Document, DocumentStore, Error, ParentId, QueueEntry, Result,
    StudentId,
};
use serde_json::Value;

pub fn entry(parent: &str, student: &str, at: DateTime<Utc>) -> QueueEntry {
    QueueEntry::new(
        format!("Student {student}"),
        "3B",
        ParentId::parse(parent).expect("valid parent id"),
        StudentId::parse(student).expect("valid student id"),
        at,
    )
}

pub fn entries(parent: &str, students: &[&str]) -> Vec<QueueEntry> {
    let at = Utc::now();
    students.iter().map(|s| entry(parent, s, at)).collect()
}

/// Store wrapper whose lane writes can be made to fail on demand.
///
/// Reads and writes to other collections always go to the inner store.
pub struct FlakyStore {
    inner: Arc<dyn DocumentStore>,
    fail_lane_writes: AtomicBool,
    lane_writes: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: Arc<dyn DocumentStore>) -> Self {
        Self {
            inner,
            fail_lane_writes: AtomicBool::new(false),
            lane_writes: AtomicUsize::new(0),
        }
    }

    pub fn fail_lane_writes(&self, fail: bool) {
        self.fail_lane_writes.store(fail, Ordering::SeqCst);
    }

    /// Lane writes attempted so far, failed ones included.
    pub fn lane_writes(&self) -> usize {
        self.lane_writes.load(Ordering::SeqCst)
    }

    fn check(&self, collection: &str) -> Result<()> {
        if collection != LANE_COLLECTION {
            return Ok(());
        }
        self.lane_writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_lane_writes.load(Ordering::SeqCst) {
            return Err(Error::store("injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.inner.get_document(collection, id).await
    }

    async fn create_document(&self, collection: &str, id: &str, doc: Document) -> Result<()> {
        self.check(collection)?;
        self.inner.create_document(collection, id, doc).await
    }

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        doc: Document,
        merge: bool,
    ) -> Result<()> {
        self.check(collection)?;
        self.inner.set_document(collection, id, doc, merge).await
    }

    async fn add_document(&self, collection: &str, doc: Document) -> Result<String> {
        self.check(collection)?;
        self.inner.add_document(collection, doc).await
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<()> {
        self.check(collection)?;
        self.inner.delete_document(collection, id).await
    }

    async fn union_update(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        values: Vec<Value>,
    ) -> Result<()> {
        self.check(collection)?;
        self.inner.union_update(collection, id, field, values).await
    }

    async fn difference_update(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        values: Vec<Value>,
    ) -> Result<()> {
        self.check(collection)?;
        self.inner
            .difference_update(collection, id, field, values)
            .await
    }

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<(String, Document)>> {
        self.inner.find_by_field(collection, field, value).await
    }
}
