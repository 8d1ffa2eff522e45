pub mod settings;

pub use settings::{
    AppConfig, CorsConfig, DriveConfig, OAuthSettings, ServerConfig, UploadConfig, Verbosity,
    DRIVE_FILE_SCOPE,
};
