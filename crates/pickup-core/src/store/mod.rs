//! Document store abstraction.
//!
//! The store offers keyed documents and two array primitives, `union_update`
//! and `difference_update`, each atomic for a single document. There are no
//! multi-document transactions. Everything that must stay correct under
//! concurrent writers is expressed through those two primitives.
//!
//! Backends:
//! - [`MemoryStore`] - process-local, for tests and throwaway sessions
//! - [`SqliteStore`] - durable `SQLite` file shared between processes

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::Result;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// A stored document: top-level field name to JSON value.
pub type Document = Map<String, Value>;

/// Keyed document storage with per-document atomic array updates.
///
/// # Error Conditions
///
/// - `StoreUnavailable`: the backend could not complete the call
/// - `NotFound`: the operation requires an existing document
/// - `Conflict`: `create_document` found the document already present
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Point lookup.
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Create a document only if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if a document with this id already exists.
    async fn create_document(&self, collection: &str, id: &str, doc: Document) -> Result<()>;

    /// Write a document. With `merge`, top-level fields are merged into the
    /// existing document instead of replacing it.
    async fn set_document(&self, collection: &str, id: &str, doc: Document, merge: bool)
        -> Result<()>;

    /// Insert a document under a store-assigned id and return the id.
    async fn add_document(&self, collection: &str, doc: Document) -> Result<String>;

    /// Delete a document.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the document does not exist.
    async fn delete_document(&self, collection: &str, id: &str) -> Result<()>;

    /// Append each value not already present (by value equality) to the array `field`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the document does not exist. Creating it is the
    /// caller's responsibility.
    async fn union_update(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        values: Vec<Value>,
    ) -> Result<()>;

    /// Remove every element equal to one of `values` from the array `field`.
    ///
    /// A missing document or missing values are not an error.
    async fn difference_update(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        values: Vec<Value>,
    ) -> Result<()>;

    /// All documents whose top-level `field` equals `value`, with their ids.
    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<(String, Document)>>;
}

/// Apply a set-union to the array `field` of `doc`. Returns the number appended.
///
/// A missing or non-array field is treated as an empty array.
pub(crate) fn apply_union(doc: &mut Document, field: &str, values: Vec<Value>) -> usize {
    let mut array = match doc.remove(field) {
        Some(Value::Array(array)) => array,
        _ => Vec::new(),
    };
    let before = array.len();
    for value in values {
        if !array.contains(&value) {
            array.push(value);
        }
    }
    let added = array.len() - before;
    doc.insert(field.to_string(), Value::Array(array));
    added
}

/// Apply a set-difference to the array `field` of `doc`. Returns the number removed.
pub(crate) fn apply_difference(doc: &mut Document, field: &str, values: &[Value]) -> usize {
    match doc.get_mut(field) {
        Some(Value::Array(array)) => {
            let before = array.len();
            array.retain(|v| !values.contains(v));
            before - array.len()
        }
        _ => 0,
    }
}

/// Shallow merge of top-level fields.
pub(crate) fn merge_fields(target: &mut Document, incoming: Document) {
    for (key, value) in incoming {
        target.insert(key, value);
    }
}

/// Whether `doc` has a top-level `field` equal to `value`.
pub(crate) fn field_matches(doc: &Document, field: &str, value: &Value) -> bool {
    doc.get(field) == Some(value)
}

/// Fresh store-assigned document id.
pub(crate) fn new_document_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
