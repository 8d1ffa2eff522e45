use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::upload::UploadPolicy;

pub const DRIVE_FILE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub oauth: OAuthSettings,
    pub drive: DriveConfig,
    pub upload: UploadConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_seconds: u64,
    pub static_dir: PathBuf,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct OAuthSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveConfig {
    /// Parent folder for every uploaded object. Empty means the Drive root.
    pub folder_id: String,
    pub upload_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// `success`, `fileId` and `fileName` only.
    Minimal,
    /// Adds a human-readable `message` and the `webViewLink` when Drive returns one.
    Detailed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub max_file_size_mb: u64,
    pub restrict_content_types: bool,
    pub allowed_content_types: Vec<String>,
    pub staging_dir: PathBuf,
    pub verbosity: Verbosity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            oauth: OAuthSettings::default(),
            drive: DriveConfig::default(),
            upload: UploadConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            request_timeout_seconds: 60,
            static_dir: PathBuf::from("./public"),
        }
    }
}

impl Default for OAuthSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: "http://localhost:3000/auth/callback".to_string(),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            scopes: vec![DRIVE_FILE_SCOPE.to_string()],
        }
    }
}

// Client secret stays out of logs.
impl std::fmt::Debug for OAuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("scopes", &self.scopes)
            .finish()
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            folder_id: String::new(),
            upload_url: "https://www.googleapis.com/upload/drive/v3".to_string(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 10,
            restrict_content_types: false,
            allowed_content_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/gif".to_string(),
                "image/webp".to_string(),
            ],
            staging_dir: PathBuf::from("./uploads"),
            verbosity: Verbosity::Detailed,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

impl UploadConfig {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(MIB)
    }

    pub fn policy(&self) -> UploadPolicy {
        let policy = UploadPolicy::new(self.max_file_size_bytes());
        if self.restrict_content_types {
            policy.with_allowed_content_types(self.allowed_content_types.iter().cloned())
        } else {
            policy
        }
    }
}

impl AppConfig {
    /// Layers defaults, `config.toml`, `APP__*` variables and finally the
    /// plain deployment variables (`CLIENT_ID`, `CLIENT_SECRET`,
    /// `REDIRECT_URI`, `FOLDER_ID`, `PORT`).
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?);

        if std::path::Path::new("config.toml").exists() {
            builder = builder.add_source(File::with_name("config"));
        }

        builder = builder.add_source(
            Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("oauth.scopes")
                .with_list_parse_key("upload.allowed_content_types")
                .with_list_parse_key("cors.allowed_origins")
                .try_parsing(true),
        );

        builder = builder
            .set_override_option("oauth.client_id", env_value("CLIENT_ID"))?
            .set_override_option("oauth.client_secret", env_value("CLIENT_SECRET"))?
            .set_override_option("oauth.redirect_uri", env_value("REDIRECT_URI"))?
            .set_override_option("drive.folder_id", env_value("FOLDER_ID"))?
            .set_override_option("server.port", env_value("PORT"))?;

        let config = builder.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        app_config.validate()?;

        Ok(app_config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("Server port cannot be 0".to_string()));
        }

        if self.upload.max_file_size_mb == 0 {
            return Err(ConfigError::Message(
                "Max file size must be greater than 0".to_string(),
            ));
        }

        if self.upload.restrict_content_types && self.upload.allowed_content_types.is_empty() {
            return Err(ConfigError::Message(
                "Content type restriction is enabled but no content types are allowed".to_string(),
            ));
        }

        if self.oauth.scopes.is_empty() {
            return Err(ConfigError::Message(
                "At least one OAuth scope is required".to_string(),
            ));
        }

        if self.oauth.client_id.is_empty() || self.oauth.client_secret.is_empty() {
            tracing::warn!("OAuth client credentials are not configured - /auth will fail until CLIENT_ID and CLIENT_SECRET are set");
        }

        if self.drive.folder_id.is_empty() {
            tracing::warn!("No Drive folder configured - uploads will land in the Drive root");
        }

        Ok(())
    }

    pub fn create_directories(&self) -> Result<(), std::io::Error> {
        std::fs::create_dir_all(&self.upload.staging_dir)?;
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}
