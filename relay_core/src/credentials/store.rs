//! Process-wide holder for the delegated credential

use parking_lot::RwLock;
use std::sync::Arc;

use super::models::Credential;

/// Storage seam for the single tenant's credential.
///
/// The relay and the authorization flow only see this trait, so a persistent
/// or multi-tenant backend can replace the in-memory one.
pub trait CredentialStore: Send + Sync {
    /// Replaces whatever is stored.
    fn set(&self, credential: Credential);

    fn get(&self) -> Option<Credential>;

    fn clear(&self);

    fn is_authorized(&self) -> bool {
        self.get()
            .map(|credential| credential.has_access_token())
            .unwrap_or(false)
    }
}

/// Credential kept in memory for the lifetime of the process.
#[derive(Clone, Default)]
pub struct MemoryCredentialStore {
    inner: Arc<RwLock<Option<Credential>>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn set(&self, credential: Credential) {
        *self.inner.write() = Some(credential);
        tracing::debug!("Stored delegated credential");
    }

    fn get(&self) -> Option<Credential> {
        self.inner.read().clone()
    }

    fn clear(&self) {
        *self.inner.write() = None;
        tracing::debug!("Cleared delegated credential");
    }

    fn is_authorized(&self) -> bool {
        self.inner
            .read()
            .as_ref()
            .map(Credential::has_access_token)
            .unwrap_or(false)
    }
}
