//! The upload relay: validate, stage locally, forward to the storage
//! provider, and always clean up.

use bytes::Bytes;
use futures_util::{stream, Stream};
use std::convert::Infallible;
use std::fmt::Display;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use super::outcome::UploadOutcome;
use super::staging::StagingArea;
use super::validation::{normalize_content_type, UploadPolicy};
use crate::credentials::{Credential, CredentialStore};
use crate::drive::{CreateObjectRequest, RemoteObject, StorageProvider};
use crate::error::{AppError, Result};

/// One file part as received from the client.
pub struct IncomingFile<S> {
    pub name: String,
    pub content_type: Option<String>,
    /// Size announced by the client, if any. Checked before staging; the
    /// staged byte count is always enforced regardless.
    pub declared_size: Option<u64>,
    pub body: S,
}

/// Body type for calls that carry no file.
pub type NoBody = stream::Empty<std::result::Result<Bytes, Infallible>>;

pub struct UploadRelay {
    store: Arc<dyn CredentialStore>,
    provider: Arc<dyn StorageProvider>,
    staging: StagingArea,
    policy: UploadPolicy,
    folder_id: Option<String>,
    include_link: bool,
}

impl UploadRelay {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        provider: Arc<dyn StorageProvider>,
        staging: StagingArea,
        policy: UploadPolicy,
    ) -> Self {
        Self {
            store,
            provider,
            staging,
            policy,
            folder_id: None,
            include_link: false,
        }
    }

    /// Destination folder for every upload. Blank means the Drive root.
    pub fn with_folder(mut self, folder_id: impl Into<String>) -> Self {
        let folder_id = folder_id.into();
        self.folder_id = if folder_id.trim().is_empty() {
            None
        } else {
            Some(folder_id)
        };
        self
    }

    pub fn with_links(mut self, include_link: bool) -> Self {
        self.include_link = include_link;
        self
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    pub async fn relay<S, E>(&self, file: Option<IncomingFile<S>>) -> UploadOutcome
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Send,
        E: Display + Send,
    {
        let outcome: UploadOutcome = self.try_relay(file).await.into();

        match &outcome {
            UploadOutcome::Accepted { file_id, file_name, .. } => {
                info!(file_id = %file_id, file_name = %file_name, "Upload relayed")
            }
            UploadOutcome::Failed { kind, reason } => {
                error!(kind = ?kind, reason = %reason, "Upload relay failed")
            }
            rejected => warn!(outcome = ?rejected, "Upload rejected"),
        }

        outcome
    }

    #[instrument(skip_all)]
    async fn try_relay<S, E>(&self, file: Option<IncomingFile<S>>) -> Result<RemoteObject>
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Send,
        E: Display + Send,
    {
        let file = match file {
            Some(file) if !file.name.trim().is_empty() => file,
            _ => return Err(AppError::NoFileSupplied),
        };

        if !self.store.is_authorized() {
            return Err(AppError::Unauthorized);
        }

        let content_type = normalize_content_type(file.content_type.as_deref(), &file.name);
        self.policy.validate_content_type(&content_type)?;
        if let Some(size) = file.declared_size {
            self.policy.validate_size(size)?;
        }

        let staged = self
            .staging
            .stage(&file.name, &content_type, file.body, self.policy.max_file_size())
            .await?;

        // The credential may have been cleared or replaced while the body was
        // streaming in.
        let credential = self
            .store
            .get()
            .filter(Credential::has_access_token)
            .ok_or(AppError::Unauthorized)?;

        let request = CreateObjectRequest {
            name: staged.original_name().to_string(),
            content_type: staged.content_type().to_string(),
            parent_folder_id: self.folder_id.clone(),
            source_path: staged.path().to_path_buf(),
            include_link: self.include_link,
        };

        let result = self.provider.create_object(&credential, request).await;
        drop(staged);

        Ok(result?)
    }
}
