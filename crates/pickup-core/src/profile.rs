//! Parent profiles keyed by identity provider user id.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    ids::ParentId,
    store::{Document, DocumentStore},
    Error, Result,
};

/// Collection holding one profile per parent.
pub const PARENT_COLLECTION: &str = "parents";

/// Identity and contact details of a parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentProfile {
    pub first_name: String,
    pub last_name: String,
    pub national_id: String,
    pub phone: String,
    pub email: String,
}

impl ParentProfile {
    /// Name shown in greetings
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Reads and writes parent profiles.
#[derive(Clone)]
pub struct ParentDirectory {
    store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for ParentDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParentDirectory").finish_non_exhaustive()
    }
}

impl ParentDirectory {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Save a profile, merging into any fields already stored for this parent.
    pub async fn save(&self, parent: &ParentId, profile: &ParentProfile) -> Result<()> {
        let doc = match serde_json::to_value(profile)? {
            Value::Object(map) => map,
            _ => Document::new(),
        };
        self.store
            .set_document(PARENT_COLLECTION, parent.as_str(), doc, true)
            .await
    }

    /// Load a parent's profile.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the parent never saved a profile.
    pub async fn load(&self, parent: &ParentId) -> Result<ParentProfile> {
        let doc = self
            .store
            .get_document(PARENT_COLLECTION, parent.as_str())
            .await?
            .ok_or_else(|| Error::not_found("parent profile", parent))?;
        Ok(serde_json::from_value(Value::Object(doc))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn profile() -> ParentProfile {
        ParentProfile {
            first_name: "Marta".into(),
            last_name: "Quispe".into(),
            national_id: "0102030405".into(),
            phone: "0991234567".into(),
            email: "marta@example.com".into(),
        }
    }

    #[tokio::test]
    async fn test_save_then_load() -> Result<()> {
        let directory = ParentDirectory::new(Arc::new(MemoryStore::new()));
        let parent = ParentId::parse("p1")?;
        directory.save(&parent, &profile()).await?;
        assert_eq!(directory.load(&parent).await?, profile());
        Ok(())
    }

    #[tokio::test]
    async fn test_load_missing_is_not_found() -> Result<()> {
        let directory = ParentDirectory::new(Arc::new(MemoryStore::new()));
        let result = directory.load(&ParentId::parse("ghost")?).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
        Ok(())
    }

    #[test]
    fn test_full_name() {
        assert_eq!(profile().full_name(), "Marta Quispe");
    }
}
