//! Session cache: the signed-in parent for the lifetime of one app session.
//!
//! Passed explicitly to whoever needs it. Filled on login, cleared on logout,
//! never persisted.

use crate::{identity::IdentityProvider, ids::ParentId, profile::ParentProfile};

/// Process-local state of the current sign-in.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    user: Option<ParentId>,
    profile: Option<ParentProfile>,
}

impl SessionContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session for a signed-in parent. The profile may be missing
    /// when the account has not filled one in yet.
    pub fn begin(&mut self, user: ParentId, profile: Option<ParentProfile>) {
        self.user = Some(user);
        self.profile = profile;
    }

    #[must_use]
    pub const fn user_id(&self) -> Option<&ParentId> {
        self.user.as_ref()
    }

    #[must_use]
    pub const fn profile(&self) -> Option<&ParentProfile> {
        self.profile.as_ref()
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.user.is_some()
    }

    /// Forget everything cached for this session.
    pub fn clear(&mut self) {
        self.user = None;
        self.profile = None;
    }

    /// Clear the cache and sign out of the identity provider.
    pub async fn logout(&mut self, identity: &dyn IdentityProvider) {
        self.clear();
        identity.sign_out().await;
    }
}
