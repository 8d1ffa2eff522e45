use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct CreateObjectRequest {
    pub name: String,
    pub content_type: String,
    pub parent_folder_id: Option<String>,
    pub source_path: PathBuf,
    pub include_link: bool,
}

impl CreateObjectRequest {
    /// Partial response selector; only what the caller reports back.
    pub fn fields(&self) -> &'static str {
        if self.include_link {
            "id,name,webViewLink"
        } else {
            "id,name"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
}

/// Metadata part of a multipart upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileMetadata<'a> {
    pub name: &'a str,
    pub mime_type: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: String,
}
