use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::AppState;
use crate::error::AppResult;
use crate::middleware::request_id::RequestId;

/// Redirect target for browser logins. The token sits in the URL fragment,
/// which never reaches the server, so the page posts its own location back.
const OAUTH_CALLBACK_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>WATTO</title></head>
<body>
<p id="message">Completing login...</p>
<script>
fetch("/oauthcallback", {
  method: "POST",
  headers: { "Content-Type": "application/json" },
  body: JSON.stringify({ url: window.location.href })
})
  .then(function (response) { return response.json(); })
  .then(function (reply) {
    var text = reply.status === "connected"
      ? "You are logged in. You can close this window."
      : "Login was not completed. You can close this window.";
    document.getElementById("message").textContent = text;
  })
  .catch(function () {
    document.getElementById("message").textContent = "Login could not be completed.";
  });
</script>
</body>
</html>
"#;

const LOGOUT_CALLBACK_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>WATTO</title></head>
<body><p>You are logged out. You can close this window.</p></body>
</html>
"#;

#[derive(Debug, Deserialize)]
pub struct OAuthCallbackRequest {
    pub url: String,
}

pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

pub async fn oauth_callback_page() -> Html<&'static str> {
    Html(OAUTH_CALLBACK_PAGE)
}

pub async fn logout_callback_page() -> Html<&'static str> {
    Html(LOGOUT_CALLBACK_PAGE)
}

/// Completes the pending login with the redirect URL posted by the callback page
pub async fn oauth_callback(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<OAuthCallbackRequest>,
) -> AppResult<Response> {
    tracing::info!(request_id = %request_id, "Received OAuth redirect");

    match state.auth.oauth_callback(&request.url).await? {
        Some(status) => {
            tracing::info!(
                request_id = %request_id,
                status = ?status.status,
                "OAuth redirect processed"
            );
            Ok(Json(status).into_response())
        }
        None => Ok((
            StatusCode::CONFLICT,
            Json(json!({ "error": "No login attempt is waiting for a redirect" })),
        )
            .into_response()),
    }
}
