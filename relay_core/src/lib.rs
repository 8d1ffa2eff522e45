//! Core library for the Drive upload relay: OAuth authorization, the upload
//! pipeline and the HTTP surface that ties them together.

pub mod config;
pub mod credentials;
pub mod drive;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod oauth;
pub mod upload;

pub use config::{AppConfig, Verbosity};
pub use credentials::{Credential, CredentialStore, MemoryCredentialStore};
pub use drive::{DriveError, GoogleDriveClient, StorageProvider};
pub use error::{AppError, Result};
pub use handlers::routes::create_routes;
pub use middleware::cors::cors_layer_from_config;
pub use oauth::AuthorizationFlow;
pub use upload::{StagingArea, UploadOutcome, UploadRelay};

use axum::Router;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tower_http::services::ServeDir;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub credentials: Arc<dyn CredentialStore>,
    pub auth_flow: Arc<AuthorizationFlow>,
    pub relay: Arc<UploadRelay>,
}

impl AppState {
    /// Production wiring: in-memory credential and Google Drive as the
    /// storage provider.
    pub fn new(config: AppConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.server.request_timeout_seconds))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        let provider = Arc::new(GoogleDriveClient::new(
            http_client.clone(),
            config.drive.upload_url.clone(),
        ));

        Ok(Self::with_components(
            config,
            http_client,
            Arc::new(MemoryCredentialStore::new()),
            provider,
        ))
    }

    pub fn with_components(
        config: AppConfig,
        http_client: reqwest::Client,
        credentials: Arc<dyn CredentialStore>,
        provider: Arc<dyn StorageProvider>,
    ) -> Self {
        let auth_flow = AuthorizationFlow::new(
            config.oauth.clone(),
            http_client,
            credentials.clone(),
        );

        let relay = UploadRelay::new(
            credentials.clone(),
            provider,
            StagingArea::new(config.upload.staging_dir.clone()),
            config.upload.policy(),
        )
        .with_folder(config.drive.folder_id.clone())
        .with_links(config.upload.verbosity == Verbosity::Detailed);

        Self {
            config: Arc::new(config),
            credentials,
            auth_flow: Arc::new(auth_flow),
            relay: Arc::new(relay),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();

    Router::new()
        .merge(create_routes(&config))
        .fallback_service(ServeDir::new(&config.server.static_dir))
        .layer(middleware::cors::cors_layer_from_config(&config.cors))
        .layer(middleware::logging::logging_layer())
        .with_state(state)
}

pub async fn run_server(app: Router, addr: SocketAddr) -> Result<()> {
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Other(anyhow::anyhow!("Failed to bind {}: {}", addr, e)))?;

    let app = app.into_make_service_with_connect_info::<SocketAddr>();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Other(e.into()))?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
