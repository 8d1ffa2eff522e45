//! Google Drive v3 upload client
//!
//! Uploads use `uploadType=multipart`: one `multipart/related` request whose
//! first part is the JSON metadata and whose second part is the file content,
//! streamed from disk.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{future, stream, StreamExt};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::io::ReaderStream;
use tracing::{debug, info, instrument, warn};

use super::error::DriveError;
use super::models::{CreateObjectRequest, ErrorEnvelope, FileMetadata, RemoteObject};
use super::StorageProvider;
use crate::credentials::Credential;

static BOUNDARY_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Clone)]
pub struct GoogleDriveClient {
    http_client: reqwest::Client,
    upload_url: String,
}

impl GoogleDriveClient {
    pub fn new(http_client: reqwest::Client, upload_url: impl Into<String>) -> Self {
        Self {
            http_client,
            upload_url: upload_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn boundary() -> String {
        let seq = BOUNDARY_SEQ.fetch_add(1, Ordering::Relaxed);
        format!(
            "relay_boundary_{}_{}",
            chrono::Utc::now().timestamp_millis(),
            seq
        )
    }

    async fn error_from_response(response: reqwest::Response) -> DriveError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .ok()
            .map(|envelope| envelope.error.message)
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    format!("request failed with status {}", status)
                } else {
                    body
                }
            });

        DriveError::from_status(status, message)
    }
}

#[async_trait]
impl StorageProvider for GoogleDriveClient {
    #[instrument(skip(self, credential, request), fields(name = %request.name, content_type = %request.content_type))]
    async fn create_object(
        &self,
        credential: &Credential,
        request: CreateObjectRequest,
    ) -> Result<RemoteObject, DriveError> {
        let file = tokio::fs::File::open(&request.source_path).await?;
        let content_length = file.metadata().await?.len();

        let metadata = FileMetadata {
            name: &request.name,
            mime_type: &request.content_type,
            parents: request.parent_folder_id.as_deref().into_iter().collect(),
        };
        let metadata_json = serde_json::to_string(&metadata)
            .map_err(|e| DriveError::Decode(format!("could not encode metadata: {}", e)))?;

        let boundary = Self::boundary();
        let head = format!(
            "--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata_json}\r\n--{boundary}\r\nContent-Type: {}\r\n\r\n",
            request.content_type
        );
        let tail = format!("\r\n--{boundary}--\r\n");
        let total_length = head.len() as u64 + content_length + tail.len() as u64;

        let body = stream::once(future::ready(Ok::<_, std::io::Error>(Bytes::from(head))))
            .chain(ReaderStream::new(file))
            .chain(stream::once(future::ready(Ok(Bytes::from(tail)))));

        debug!(bytes = content_length, "Uploading to Drive");

        let response = self
            .http_client
            .post(format!("{}/files", self.upload_url))
            .query(&[("uploadType", "multipart"), ("fields", request.fields())])
            .bearer_auth(&credential.access_token)
            .header(CONTENT_TYPE, format!("multipart/related; boundary={}", boundary))
            .header(CONTENT_LENGTH, total_length)
            .body(reqwest::Body::wrap_stream(body))
            .send()
            .await
            .map_err(|e| DriveError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let error = Self::error_from_response(response).await;
            warn!(error = %error, "Drive rejected upload");
            return Err(error);
        }

        let object: RemoteObject = response
            .json()
            .await
            .map_err(|e| DriveError::Decode(e.to_string()))?;

        info!(file_id = %object.id, "Drive object created");

        Ok(object)
    }
}
