use serde::Deserialize;

use crate::credentials::Credential;

/// Successful token endpoint response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl From<TokenResponse> for Credential {
    fn from(response: TokenResponse) -> Self {
        let mut credential = Credential::new(response.access_token);
        credential.refresh_token = response.refresh_token;
        credential.token_type = response.token_type;
        credential.scope = response.scope;
        match response.expires_in {
            Some(seconds) => credential.expiring_in(seconds),
            None => credential,
        }
    }
}

/// RFC 6749 §5.2 error body.
#[derive(Debug, Deserialize)]
pub struct TokenErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl TokenErrorResponse {
    pub fn reason(self) -> String {
        match self.error_description {
            Some(description) if !description.trim().is_empty() => {
                format!("{}: {}", self.error, description)
            }
            _ => self.error,
        }
    }
}

/// Query string the authorization server appends to the redirect.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}
