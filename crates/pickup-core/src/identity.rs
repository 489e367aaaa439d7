//! Identity provider: who is signed in on this device.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::{
    ids::ParentId,
    store::{Document, DocumentStore},
    Error, Result,
};

/// Collection holding one credential record per user.
pub const USER_COLLECTION: &str = "users";

/// Create-if-absent claims that keep emails unique across accounts.
const EMAIL_CLAIMS: &str = "user_emails";

/// Create-if-absent claims that keep national ids unique across accounts.
const NATIONAL_ID_CLAIMS: &str = "user_national_ids";

/// Shown for every rejected sign-in, whichever part was wrong.
const SIGN_IN_REJECTED: &str = "Sign-in failed. Check your credentials.";

/// Minimum accepted password length.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Authenticated user lookup.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Stable id of the signed-in user, if any.
    async fn current_user_id(&self) -> Option<ParentId>;

    /// End the current session. Signing out twice is fine.
    async fn sign_out(&self);
}

/// Stored credential record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Credential {
    email: String,
    national_id: String,
    password_salt: String,
    password_hash: String,
}

impl Credential {
    fn verify(&self, password: &str) -> bool {
        hash_password(&self.password_salt, password) == self.password_hash
    }
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn claim_key(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

fn to_document(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

/// Identity provider whose accounts live in the document store.
///
/// Parents sign up with email, password and national id, and sign in with
/// either the email or the national id.
pub struct DocumentIdentity {
    store: Arc<dyn DocumentStore>,
    current: RwLock<Option<ParentId>>,
}

impl std::fmt::Debug for DocumentIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentIdentity").finish_non_exhaustive()
    }
}

impl DocumentIdentity {
    /// Create a provider with nobody signed in
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            current: RwLock::new(None),
        }
    }

    /// Create an account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailed` for a malformed email, a short password, a
    /// blank national id, or an email / national id already in use.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        national_id: &str,
    ) -> Result<ParentId> {
        let email = email.trim().to_lowercase();
        let national_id = national_id.trim().to_string();

        if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            return Err(Error::validation(format!("'{email}' is not a valid email")));
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(Error::validation(format!(
                "password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }
        if national_id.is_empty() {
            return Err(Error::validation("national id is required"));
        }

        let id = ParentId::parse(uuid::Uuid::new_v4().simple().to_string())?;
        self.claim(EMAIL_CLAIMS, &email, &id, "email").await?;
        if let Err(err) = self
            .claim(NATIONAL_ID_CLAIMS, &national_id, &id, "national id")
            .await
        {
            self.release(EMAIL_CLAIMS, &email).await;
            return Err(err);
        }

        let salt = uuid::Uuid::new_v4().simple().to_string();
        let credential = Credential {
            password_hash: hash_password(&salt, password),
            password_salt: salt,
            email,
            national_id,
        };
        let doc = to_document(serde_json::to_value(&credential)?);
        if let Err(err) = self
            .store
            .create_document(USER_COLLECTION, id.as_str(), doc)
            .await
        {
            self.release(EMAIL_CLAIMS, &credential.email).await;
            self.release(NATIONAL_ID_CLAIMS, &credential.national_id).await;
            return Err(err);
        }

        tracing::info!(user = %id, "account created");
        *self.current.write().await = Some(id.clone());
        Ok(id)
    }

    /// Reserve `value` for `id`. Only one account can ever hold a claim.
    async fn claim(&self, collection: &str, value: &str, id: &ParentId, what: &str) -> Result<()> {
        let doc = to_document(serde_json::json!({ "userId": id.as_str() }));
        match self
            .store
            .create_document(collection, &claim_key(value), doc)
            .await
        {
            Err(Error::Conflict(_)) => Err(Error::validation(format!(
                "{what} '{value}' is already registered"
            ))),
            other => other,
        }
    }

    async fn release(&self, collection: &str, value: &str) {
        if let Err(err) = self
            .store
            .delete_document(collection, &claim_key(value))
            .await
        {
            tracing::warn!(collection, error = %err, "failed to release sign-up claim");
        }
    }

    /// Sign in with email and password.
    pub async fn sign_in_with_email(&self, email: &str, password: &str) -> Result<ParentId> {
        let email = email.trim().to_lowercase();
        self.sign_in("email", &email, password).await
    }

    /// Sign in with national id and password.
    pub async fn sign_in_with_national_id(
        &self,
        national_id: &str,
        password: &str,
    ) -> Result<ParentId> {
        self.sign_in("nationalId", national_id.trim(), password)
            .await
    }

    async fn sign_in(&self, field: &str, value: &str, password: &str) -> Result<ParentId> {
        let (id, credential) = self
            .find(field, value)
            .await?
            .ok_or_else(|| {
                tracing::warn!(field, "sign-in for unknown account");
                Error::AuthFailed(SIGN_IN_REJECTED.to_string())
            })?;

        if !credential.verify(password) {
            tracing::warn!(user = %id, "rejected sign-in: wrong password");
            return Err(Error::AuthFailed(SIGN_IN_REJECTED.to_string()));
        }

        tracing::info!(user = %id, "signed in");
        *self.current.write().await = Some(id.clone());
        Ok(id)
    }

    async fn find(&self, field: &str, value: &str) -> Result<Option<(ParentId, Credential)>> {
        self.store
            .find_by_field(USER_COLLECTION, field, &Value::String(value.to_string()))
            .await?
            .into_iter()
            .next()
            .map(|(id, doc)| -> Result<(ParentId, Credential)> {
                let credential: Credential = serde_json::from_value(Value::Object(doc))?;
                Ok((ParentId::parse(id)?, credential))
            })
            .transpose()
    }
}

#[async_trait]
impl IdentityProvider for DocumentIdentity {
    async fn current_user_id(&self) -> Option<ParentId> {
        self.current.read().await.clone()
    }

    async fn sign_out(&self) {
        if let Some(id) = self.current.write().await.take() {
            tracing::info!(user = %id, "signed out");
        }
    }
}
