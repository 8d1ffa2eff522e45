//! Remote storage provider seam and its Google Drive implementation

pub mod client;
pub mod error;
pub mod models;

pub use client::GoogleDriveClient;
pub use error::DriveError;
pub use models::{CreateObjectRequest, RemoteObject};

use async_trait::async_trait;

use crate::credentials::Credential;

#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Creates a new object from the file at `request.source_path`.
    ///
    /// Every call creates a distinct object; nothing is deduplicated.
    async fn create_object(
        &self,
        credential: &Credential,
        request: CreateObjectRequest,
    ) -> Result<RemoteObject, DriveError>;
}
