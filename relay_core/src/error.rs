//! Application error types and handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::drive::DriveError;
use crate::upload::ValidationError;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("No file was selected")]
    NoFileSupplied,

    #[error("Not authenticated with Google Drive")]
    Unauthorized,

    #[error(transparent)]
    ValidationRejected(#[from] ValidationError),

    #[error("Authorization exchange failed: {reason}")]
    AuthorizationExchange { reason: String },

    #[error(transparent)]
    RemoteTransfer(#[from] DriveError),

    #[error("Staging error: {0}")]
    StagingIo(#[from] std::io::Error),

    #[error("Upload stream interrupted: {0}")]
    ClientStream(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NoFileSupplied
            | AppError::ValidationRejected(_)
            | AppError::ClientStream(_)
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::AuthorizationExchange { .. } => StatusCode::BAD_GATEWAY,
            AppError::RemoteTransfer(_)
            | AppError::StagingIo(_)
            | AppError::Configuration(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message surfaced to the client. Provider and exchange errors pass
    /// through verbatim; local I/O details stay in the logs.
    pub fn client_message(&self) -> String {
        match self {
            AppError::RemoteTransfer(err) => format!("Error: {}", err.message()),
            AppError::StagingIo(_) => "Error: could not stage the uploaded file".to_string(),
            AppError::Other(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            AppError::RemoteTransfer(err) => tracing::error!("Drive transfer failed: {}", err),
            AppError::StagingIo(err) => tracing::error!("Staging IO error: {:?}", err),
            AppError::Configuration(msg) => tracing::error!("Configuration error: {}", msg),
            AppError::Other(err) => tracing::error!("Unexpected error: {:?}", err),
            AppError::AuthorizationExchange { reason } => {
                tracing::warn!("Authorization exchange failed: {}", reason)
            }
            _ => {}
        }

        let body = Json(json!({
            "success": false,
            "message": self.client_message(),
        }));

        (status, body).into_response()
    }
}
