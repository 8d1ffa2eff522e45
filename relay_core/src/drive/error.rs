use thiserror::Error;

/// Failure reported by, or while talking to, the storage provider.
///
/// Every variant carries the provider's own message so it can be shown to
/// the caller unchanged.
#[derive(Error, Debug)]
pub enum DriveError {
    #[error("Drive rejected the credential: {0}")]
    Unauthorized(String),

    #[error("Drive denied the request: {0}")]
    Forbidden(String),

    #[error("Drive folder not found: {0}")]
    NotFound(String),

    #[error("Drive rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Drive API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse Drive response: {0}")]
    Decode(String),

    #[error("Failed to read staged file: {0}")]
    Io(#[from] std::io::Error),
}

impl DriveError {
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 => DriveError::Unauthorized(message),
            403 => DriveError::Forbidden(message),
            404 => DriveError::NotFound(message),
            429 => DriveError::RateLimited(message),
            _ => DriveError::Api { status, message },
        }
    }

    pub fn message(&self) -> String {
        match self {
            DriveError::Unauthorized(msg)
            | DriveError::Forbidden(msg)
            | DriveError::NotFound(msg)
            | DriveError::RateLimited(msg)
            | DriveError::Network(msg)
            | DriveError::Decode(msg) => msg.clone(),
            DriveError::Api { message, .. } => message.clone(),
            DriveError::Io(err) => err.to_string(),
        }
    }
}
