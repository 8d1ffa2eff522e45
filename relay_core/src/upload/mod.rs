pub mod outcome;
pub mod relay;
pub mod staging;
pub mod validation;

pub use outcome::{FailureKind, UploadOutcome};
pub use relay::{IncomingFile, NoBody, UploadRelay};
pub use staging::{StagedFile, StagingArea};
pub use validation::{normalize_content_type, UploadPolicy, ValidationError};
