use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max_size} bytes)")]
    FileTooLarge { size: u64, max_size: u64 },

    #[error("Invalid file type: {content_type} (allowed: {allowed:?})")]
    InvalidFileType { content_type: String, allowed: Vec<String> },
}

/// Per-deployment acceptance rules: a size ceiling and, optionally, a MIME
/// allow-list.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    max_file_size: u64,
    allowed_content_types: Option<HashSet<String>>,
}

impl UploadPolicy {
    pub fn new(max_file_size: u64) -> Self {
        Self {
            max_file_size,
            allowed_content_types: None,
        }
    }

    pub fn with_allowed_content_types<I, T>(mut self, content_types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.allowed_content_types = Some(
            content_types
                .into_iter()
                .map(|ct| ct.as_ref().trim().to_ascii_lowercase())
                .collect(),
        );
        self
    }

    /// The stricter deployments only took pictures.
    pub fn images_only(max_file_size: u64) -> Self {
        Self::new(max_file_size).with_allowed_content_types([
            "image/jpeg",
            "image/png",
            "image/gif",
            "image/webp",
        ])
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    pub fn allowed_content_types(&self) -> Option<&HashSet<String>> {
        self.allowed_content_types.as_ref()
    }

    /// Inclusive: a file of exactly `max_file_size` bytes passes.
    pub fn validate_size(&self, size: u64) -> Result<(), ValidationError> {
        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max_size: self.max_file_size,
            });
        }
        Ok(())
    }

    /// Expects a normalized essence such as `image/png`.
    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        let Some(allowed) = &self.allowed_content_types else {
            return Ok(());
        };

        if !allowed.contains(content_type) {
            let mut allowed: Vec<String> = allowed.iter().cloned().collect();
            allowed.sort();
            return Err(ValidationError::InvalidFileType {
                content_type: content_type.to_string(),
                allowed,
            });
        }
        Ok(())
    }
}

/// Reduces a declared content type to its lowercase essence, falling back to
/// a guess from the file name when the client declared nothing usable.
pub fn normalize_content_type(declared: Option<&str>, filename: &str) -> String {
    declared
        .and_then(|value| value.trim().parse::<mime::Mime>().ok())
        .map(|parsed| parsed.essence_str().to_ascii_lowercase())
        .unwrap_or_else(|| {
            mime_guess::from_path(filename)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        })
}
