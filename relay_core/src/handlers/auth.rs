use crate::error::Result;
use crate::oauth::CallbackParams;
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::{header::LOCATION, StatusCode},
    response::{Html, IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Serialize)]
pub struct AuthStatusResponse {
    pub authenticated: bool,
}

/// Sends the browser to the consent screen.
pub async fn begin_authorization(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let url = state.auth_flow.build_authorization_url()?;
    info!("Redirecting to authorization server");

    Ok((StatusCode::FOUND, [(LOCATION, url.to_string())]))
}

/// Redirect target of the consent screen. Always answers with a page the
/// user can read, whatever happened.
pub async fn complete_authorization(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Html<String> {
    if let Some(error) = params.error.as_deref().filter(|e| !e.is_empty()) {
        let detail = match params.error_description.as_deref() {
            Some(description) if !description.is_empty() => {
                format!("{}: {}", error, description)
            }
            _ => error.to_string(),
        };
        warn!(error = %detail, "Authorization server returned an error");
        return Html(error_page(&format!("Google returned an error: {}", detail)));
    }

    let Some(code) = params.code.filter(|c| !c.trim().is_empty()) else {
        warn!("Callback reached without an authorization code");
        return Html(error_page("Missing authorization code"));
    };

    match state.auth_flow.complete_authorization(&code).await {
        Ok(_) => Html(success_page()),
        Err(e) => {
            warn!(error = %e, "Authorization callback failed");
            Html(error_page(&format!("Error: {}", e)))
        }
    }
}

pub async fn authorization_status(State(state): State<AppState>) -> Json<AuthStatusResponse> {
    Json(AuthStatusResponse {
        authenticated: state.auth_flow.is_authorized(),
    })
}

pub async fn revoke_local_authorization(State(state): State<AppState>) -> impl IntoResponse {
    state.auth_flow.revoke_local();
    Json(serde_json::json!({ "success": true }))
}

pub fn create_auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth", get(begin_authorization))
        .route("/auth/callback", get(complete_authorization))
        .route("/auth/status", get(authorization_status))
        .route("/auth/logout", post(revoke_local_authorization))
}

fn success_page() -> String {
    r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Authentication successful</title>
  <meta http-equiv="refresh" content="3;url=/">
  <style>
    body { font-family: Arial, sans-serif; text-align: center; padding: 50px; }
    .success { font-size: 24px; margin: 30px 0; color: #2e7d32; }
  </style>
</head>
<body>
  <div class="success">Connected to Google Drive</div>
  <p>This window will close automatically.</p>
  <script>
    if (window.opener) {
      window.opener.postMessage({ type: 'auth-success' }, window.location.origin);
      setTimeout(function () { window.close(); }, 1000);
    }
  </script>
</body>
</html>
"#
    .to_string()
}

fn error_page(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Authentication failed</title></head>
<body style="font-family: Arial, sans-serif; padding: 50px; text-align: center;">
  <h2 style="color: red;">{}</h2>
  <a href="/">Back to start</a>
</body>
</html>
"#,
        escape_html(message)
    )
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
