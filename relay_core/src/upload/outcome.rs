use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use super::validation::ValidationError;
use crate::config::Verbosity;
use crate::drive::{DriveError, RemoteObject};
use crate::error::AppError;

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    RemoteTransfer,
    StagingIo,
    ClientStream,
    Internal,
}

/// What the caller gets back for one relay attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Accepted {
        file_id: String,
        file_name: String,
        web_view_link: Option<String>,
    },
    RejectedNoFile,
    RejectedUnauthorized,
    RejectedInvalidType {
        content_type: String,
    },
    RejectedTooLarge {
        max_size: u64,
    },
    Failed {
        kind: FailureKind,
        reason: String,
    },
}

impl UploadOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, UploadOutcome::Accepted { .. })
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            UploadOutcome::Accepted { .. } => StatusCode::OK,
            UploadOutcome::RejectedNoFile
            | UploadOutcome::RejectedInvalidType { .. }
            | UploadOutcome::RejectedTooLarge { .. } => StatusCode::BAD_REQUEST,
            UploadOutcome::RejectedUnauthorized => StatusCode::UNAUTHORIZED,
            UploadOutcome::Failed { kind, .. } => match kind {
                FailureKind::ClientStream => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    pub fn message(&self) -> String {
        match self {
            UploadOutcome::Accepted { .. } => "File uploaded successfully".to_string(),
            UploadOutcome::RejectedNoFile => AppError::NoFileSupplied.to_string(),
            UploadOutcome::RejectedUnauthorized => AppError::Unauthorized.to_string(),
            UploadOutcome::RejectedInvalidType { content_type } => {
                format!("File type {} is not allowed", content_type)
            }
            UploadOutcome::RejectedTooLarge { max_size } => {
                format!("File exceeds the maximum size of {}", format_size(*max_size))
            }
            UploadOutcome::Failed { kind, reason } => match kind {
                FailureKind::RemoteTransfer | FailureKind::ClientStream => {
                    format!("Error: {}", reason)
                }
                FailureKind::StagingIo => "Error: could not stage the uploaded file".to_string(),
                FailureKind::Internal => "Internal server error".to_string(),
            },
        }
    }

    pub fn into_response_with(self, verbosity: Verbosity) -> Response {
        let status = self.status_code();

        let body = match &self {
            UploadOutcome::Accepted {
                file_id,
                file_name,
                web_view_link,
            } => {
                let mut body = json!({
                    "success": true,
                    "fileId": file_id,
                    "fileName": file_name,
                });
                if verbosity == Verbosity::Detailed {
                    body["message"] = json!(self.message());
                    if let Some(link) = web_view_link {
                        body["webViewLink"] = json!(link);
                    }
                }
                body
            }
            _ => json!({
                "success": false,
                "message": self.message(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

impl IntoResponse for UploadOutcome {
    fn into_response(self) -> Response {
        self.into_response_with(Verbosity::Detailed)
    }
}

impl From<Result<RemoteObject, AppError>> for UploadOutcome {
    fn from(result: Result<RemoteObject, AppError>) -> Self {
        match result {
            Ok(object) => UploadOutcome::Accepted {
                file_id: object.id,
                file_name: object.name,
                web_view_link: object.web_view_link,
            },
            Err(err) => err.into(),
        }
    }
}

impl From<AppError> for UploadOutcome {
    fn from(err: AppError) -> Self {
        match err {
            AppError::NoFileSupplied => UploadOutcome::RejectedNoFile,
            AppError::Unauthorized => UploadOutcome::RejectedUnauthorized,
            AppError::ValidationRejected(ValidationError::FileTooLarge { max_size, .. }) => {
                UploadOutcome::RejectedTooLarge { max_size }
            }
            AppError::ValidationRejected(ValidationError::InvalidFileType {
                content_type, ..
            }) => UploadOutcome::RejectedInvalidType { content_type },
            AppError::RemoteTransfer(DriveError::Io(e)) | AppError::StagingIo(e) => {
                UploadOutcome::Failed {
                    kind: FailureKind::StagingIo,
                    reason: e.to_string(),
                }
            }
            AppError::RemoteTransfer(e) => UploadOutcome::Failed {
                kind: FailureKind::RemoteTransfer,
                reason: e.message(),
            },
            AppError::ClientStream(reason) => UploadOutcome::Failed {
                kind: FailureKind::ClientStream,
                reason,
            },
            other => UploadOutcome::Failed {
                kind: FailureKind::Internal,
                reason: other.to_string(),
            },
        }
    }
}

fn format_size(bytes: u64) -> String {
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{} MiB", bytes / MIB)
    } else {
        format!("{} bytes", bytes)
    }
}
