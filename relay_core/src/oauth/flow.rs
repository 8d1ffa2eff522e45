//! OAuth 2.0 authorization-code flow against Google's authorization server.
//!
//! The flow is stateless between its two halves: the pending state lives in
//! the browser redirect, and each authorization code is redeemed at most once.

use std::sync::Arc;

use tracing::{info, instrument, warn};
use url::Url;

use super::models::{TokenErrorResponse, TokenResponse};
use crate::config::OAuthSettings;
use crate::credentials::{Credential, CredentialStore};
use crate::error::{AppError, Result};

pub struct AuthorizationFlow {
    settings: OAuthSettings,
    http_client: reqwest::Client,
    store: Arc<dyn CredentialStore>,
}

impl AuthorizationFlow {
    pub fn new(
        settings: OAuthSettings,
        http_client: reqwest::Client,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            settings,
            http_client,
            store,
        }
    }

    /// Builds the consent URL for offline access to files the app creates.
    ///
    /// `prompt=consent` makes Google reissue a refresh token on every pass.
    /// The result only depends on configuration.
    #[instrument(skip(self))]
    pub fn build_authorization_url(&self) -> Result<Url> {
        if self.settings.client_id.trim().is_empty() {
            return Err(AppError::Configuration("OAuth client id is not set".to_string()));
        }

        if self.settings.redirect_uri.trim().is_empty() {
            return Err(AppError::Configuration("OAuth redirect URI is not set".to_string()));
        }

        let mut url = Url::parse(&self.settings.auth_url).map_err(|e| {
            AppError::Configuration(format!("Invalid authorization endpoint: {}", e))
        })?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.settings.client_id)
            .append_pair("redirect_uri", &self.settings.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.settings.scopes.join(" "))
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");

        tracing::debug!("Built authorization URL");

        Ok(url)
    }

    /// Redeems `code` for a credential and stores it.
    ///
    /// One request, no retries. On failure the stored credential is left as is.
    #[instrument(skip(self, code))]
    pub async fn complete_authorization(&self, code: &str) -> Result<Credential> {
        if code.trim().is_empty() {
            return Err(AppError::AuthorizationExchange {
                reason: "missing authorization code".to_string(),
            });
        }

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.as_str()),
            ("redirect_uri", self.settings.redirect_uri.as_str()),
        ];

        info!("Exchanging authorization code for tokens");

        let response = self
            .http_client
            .post(&self.settings.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::AuthorizationExchange {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<TokenErrorResponse>(&body)
                .map(TokenErrorResponse::reason)
                .unwrap_or_else(|_| {
                    if body.trim().is_empty() {
                        format!("token endpoint returned {}", status)
                    } else {
                        body
                    }
                });

            warn!(status = status.as_u16(), reason = %reason, "Token exchange rejected");

            return Err(AppError::AuthorizationExchange { reason });
        }

        let token_response: TokenResponse =
            response
                .json()
                .await
                .map_err(|e| AppError::AuthorizationExchange {
                    reason: format!("unreadable token response: {}", e),
                })?;

        let credential: Credential = token_response.into();
        if !credential.has_access_token() {
            return Err(AppError::AuthorizationExchange {
                reason: "token response did not include an access token".to_string(),
            });
        }

        self.store.set(credential.clone());

        info!(
            has_refresh_token = credential.refresh_token.is_some(),
            "Authorization completed"
        );

        Ok(credential)
    }

    pub fn is_authorized(&self) -> bool {
        self.store.is_authorized()
    }

    pub fn revoke_local(&self) {
        self.store.clear();
        info!("Local credential cleared");
    }
}
