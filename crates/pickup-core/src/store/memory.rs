//! Process-local document store.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{
    apply_difference, apply_union, field_matches, merge_fields, new_document_id, Document,
    DocumentStore,
};
use crate::{Error, Result};

type Collection = BTreeMap<String, Document>;

/// In-memory store. Each mutation holds the write lock for its whole
/// read-modify-write, so union and difference are atomic per document.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .and_then(|c| c.get(id))
            .cloned())
    }

    async fn create_document(&self, collection: &str, id: &str, doc: Document) -> Result<()> {
        let mut guard = self.collections.write().await;
        let docs = guard.entry(collection.to_string()).or_default();
        if docs.contains_key(id) {
            return Err(Error::Conflict(format!("{collection}/{id} already exists")));
        }
        docs.insert(id.to_string(), doc);
        Ok(())
    }

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        doc: Document,
        merge: bool,
    ) -> Result<()> {
        let mut guard = self.collections.write().await;
        let docs = guard.entry(collection.to_string()).or_default();
        match docs.get_mut(id) {
            Some(existing) if merge => merge_fields(existing, doc),
            _ => {
                docs.insert(id.to_string(), doc);
            }
        }
        Ok(())
    }

    async fn add_document(&self, collection: &str, doc: Document) -> Result<String> {
        let id = new_document_id();
        self.create_document(collection, &id, doc).await?;
        Ok(id)
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<()> {
        self.collections
            .write()
            .await
            .get_mut(collection)
            .and_then(|c| c.remove(id))
            .map(|_| ())
            .ok_or_else(|| Error::not_found("document", format!("{collection}/{id}")))
    }

    async fn union_update(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        values: Vec<Value>,
    ) -> Result<()> {
        let mut guard = self.collections.write().await;
        let doc = guard
            .get_mut(collection)
            .and_then(|c| c.get_mut(id))
            .ok_or_else(|| Error::not_found("document", format!("{collection}/{id}")))?;
        let added = apply_union(doc, field, values);
        tracing::debug!(collection, id, field, added, "union update");
        Ok(())
    }

    async fn difference_update(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        values: Vec<Value>,
    ) -> Result<()> {
        let mut guard = self.collections.write().await;
        let removed = guard
            .get_mut(collection)
            .and_then(|c| c.get_mut(id))
            .map_or(0, |doc| apply_difference(doc, field, &values));
        tracing::debug!(collection, id, field, removed, "difference update");
        Ok(())
    }

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<(String, Document)>> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, doc)| field_matches(doc, field, value))
                    .map(|(id, doc)| (id.clone(), doc.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }
}
