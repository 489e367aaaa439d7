//! Student registry: the children each parent has registered.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    ids::{ParentId, StudentId},
    store::{Document, DocumentStore},
    Error, Result,
};

/// Collection holding one document per student.
pub const STUDENT_COLLECTION: &str = "students";

/// A registered child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentProfile {
    /// Assigned by the registry on creation
    pub id: StudentId,
    /// Display name
    pub name: String,
    /// Class section
    pub section: String,
    /// Owning parent
    pub parent_id: ParentId,
}

/// Data for a student that has not been registered yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudent {
    pub name: String,
    pub section: String,
    pub parent_id: ParentId,
}

impl NewStudent {
    /// Validate and normalize the form input
    pub fn new(
        name: impl Into<String>,
        section: impl Into<String>,
        parent_id: ParentId,
    ) -> Result<Self> {
        let name = name.into().trim().to_string();
        let section = section.into().trim().to_string();
        if name.is_empty() {
            return Err(Error::validation("student name is required"));
        }
        if section.is_empty() {
            return Err(Error::validation("student section is required"));
        }
        Ok(Self {
            name,
            section,
            parent_id,
        })
    }

    fn into_profile(self, id: StudentId) -> StudentProfile {
        StudentProfile {
            id,
            name: self.name,
            section: self.section,
            parent_id: self.parent_id,
        }
    }
}

/// CRUD over student records keyed by owning parent.
#[derive(Clone)]
pub struct StudentRegistry {
    store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for StudentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StudentRegistry").finish_non_exhaustive()
    }
}

impl StudentRegistry {
    /// Create a registry over a document store
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Register a student and return the assigned id.
    pub async fn register(&self, student: NewStudent) -> Result<StudentId> {
        let doc = to_document(&student)?;
        let id = self.store.add_document(STUDENT_COLLECTION, doc).await?;
        let id = StudentId::parse(id)?;
        tracing::info!(student = %id, parent = %student.parent_id, "student registered");
        Ok(id)
    }

    /// All students of one parent, sorted by name.
    pub async fn list_by_parent(&self, parent: &ParentId) -> Result<Vec<StudentProfile>> {
        let rows = self
            .store
            .find_by_field(
                STUDENT_COLLECTION,
                "parentId",
                &Value::String(parent.to_string()),
            )
            .await?;

        let mut students = rows
            .into_iter()
            .map(|(id, doc)| from_document(&id, doc))
            .collect::<Result<Vec<_>>>()?;
        students.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        tracing::debug!(parent = %parent, count = students.len(), "students loaded");
        Ok(students)
    }

    /// Look up one student.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no student has this id.
    pub async fn get(&self, id: &StudentId) -> Result<StudentProfile> {
        self.store
            .get_document(STUDENT_COLLECTION, id.as_str())
            .await?
            .ok_or_else(|| Error::not_found("student", id))
            .and_then(|doc| from_document(id.as_str(), doc))
    }

    /// Delete a student.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no student has this id.
    pub async fn delete(&self, id: &StudentId) -> Result<()> {
        self.store
            .delete_document(STUDENT_COLLECTION, id.as_str())
            .await
            .map_err(|e| match e {
                Error::NotFound(_) => Error::not_found("student", id),
                other => other,
            })?;
        tracing::info!(student = %id, "student deleted");
        Ok(())
    }
}

fn to_document(student: &NewStudent) -> Result<Document> {
    match serde_json::to_value(student)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::ParseError(format!(
            "student did not serialize to an object: {other}"
        ))),
    }
}

fn from_document(id: &str, doc: Document) -> Result<StudentProfile> {
    let student: NewStudent = serde_json::from_value(Value::Object(doc))?;
    Ok(student.into_profile(StudentId::parse(id)?))
}
