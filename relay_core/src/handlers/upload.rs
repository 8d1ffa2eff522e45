use crate::error::AppError;
use crate::upload::{IncomingFile, NoBody, UploadOutcome};
use crate::AppState;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    response::Response,
};
use tracing::{debug, info, warn};

/// Multipart field that carries the file.
pub const FILE_FIELD: &str = "imagen";

/// Streams the `imagen` part through the upload relay. Other parts are
/// skipped; only the first matching part is relayed.
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Response {
    let verbosity = state.config.upload.verbosity;

    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            warn!(reason = %rejection.body_text(), "Rejected non-multipart upload");
            return UploadOutcome::from(AppError::ClientStream(rejection.body_text()))
                .into_response_with(verbosity);
        }
    };

    let outcome = loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some(FILE_FIELD) {
                    debug!(field = ?field.name(), "Skipping multipart field");
                    continue;
                }

                let file = IncomingFile {
                    name: field.file_name().unwrap_or_default().to_string(),
                    content_type: field.content_type().map(str::to_string),
                    declared_size: None,
                    body: field,
                };

                info!(file_name = %file.name, "POST /upload");
                break state.relay.relay(Some(file)).await;
            }
            Ok(None) => break state.relay.relay(None::<IncomingFile<NoBody>>).await,
            Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                break UploadOutcome::RejectedTooLarge {
                    max_size: state.relay.policy().max_file_size(),
                }
            }
            Err(e) => break UploadOutcome::from(AppError::ClientStream(e.body_text())),
        }
    };

    outcome.into_response_with(verbosity)
}
