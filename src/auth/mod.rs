//! Facebook login, logout and session token lifecycle.
//!
//! A login attempt moves `idle -> awaiting_redirect -> {connected | not_authorized |
//! cancelled}` and is resolved exactly once, by whichever completion path reports
//! first: the callback server receiving the redirect, or the embedded view
//! navigating to a redirect URL. There is no timeout; an abandoned attempt stays
//! pending until its view closes or a newer login supersedes it.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client as HttpClient, Method, StatusCode};
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult, AuthError};
use crate::store::{Store, StoreKey};

pub mod redirect;
pub mod status;
pub mod view;

pub use redirect::{parse_redirect, RedirectOutcome};
pub use status::{LoginState, LoginStatus};
pub use view::{OpenedView, SystemBrowser, ViewEvent, ViewHandle, ViewLauncher};

/// Minimum time an embedded login view stays open, so it is never closed while
/// still animating in.
const LOGIN_CLOSE_DEBOUNCE: Duration = Duration::from_millis(600);
const LOGOUT_CLOSE_DELAY: Duration = Duration::from_millis(700);
const APP_ID_MISSING: &str = "Facebook App Id not set.";
const GENERIC_API_ERROR: &str = "An error has occurred";

/// Provider endpoints and redirect targets
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub login_url: String,
    pub logout_url: String,
    pub embedded_redirect_url: String,
    pub graph_api_url: String,
    /// Base URL of the local callback server
    pub callback_base_url: String,
}

impl AuthSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            login_url: config.facebook_login_url.clone(),
            logout_url: config.facebook_logout_url.clone(),
            embedded_redirect_url: config.facebook_embedded_redirect_url.clone(),
            graph_api_url: config.graph_api_url.trim_end_matches('/').to_string(),
            callback_base_url: config.callback_base_url(),
        }
    }

    fn oauth_redirect_url(&self, embedded: bool) -> String {
        if embedded {
            self.embedded_redirect_url.clone()
        } else {
            format!("{}/oauthcallback.html", self.callback_base_url)
        }
    }

    fn logout_redirect_url(&self) -> String {
        format!("{}/logoutcallback.html", self.callback_base_url)
    }
}

type LoginOutcome = AppResult<LoginStatus>;

/// Handle for one login attempt, resolved exactly once
#[derive(Debug)]
pub struct LoginAttempt {
    id: Uuid,
    outcome: oneshot::Receiver<LoginOutcome>,
}

impl LoginAttempt {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Waits for the attempt to finish.
    ///
    /// Cancellation and supersession come back as [`AuthError`]s; provider
    /// refusals come back as a `not_authorized` status.
    pub async fn outcome(self) -> LoginOutcome {
        match self.outcome.await {
            Ok(outcome) => outcome,
            Err(_) => Err(AuthError::Abandoned.into()),
        }
    }
}

struct PendingLogin {
    id: Uuid,
    processed: bool,
    waiter: Option<oneshot::Sender<LoginOutcome>>,
}

impl PendingLogin {
    fn resolve(&mut self, outcome: LoginOutcome) {
        if let Some(waiter) = self.waiter.take() {
            let _ = waiter.send(outcome);
        }
    }
}

struct AuthInner {
    app_id: Option<String>,
    token_store: Store,
    pending: Option<PendingLogin>,
}

/// Facebook OAuth implicit-flow client
pub struct FacebookAuth {
    settings: AuthSettings,
    http_client: HttpClient,
    launcher: Arc<dyn ViewLauncher>,
    inner: Mutex<AuthInner>,
}

impl FacebookAuth {
    /// Creates an uninitialized client; call [`FacebookAuth::initialize`] before
    /// logging in.
    pub fn new(settings: AuthSettings, token_store: Store, launcher: Arc<dyn ViewLauncher>) -> Self {
        Self {
            settings,
            http_client: HttpClient::new(),
            launcher,
            inner: Mutex::new(AuthInner {
                app_id: None,
                token_store,
                pending: None,
            }),
        }
    }

    /// Sets the Facebook app id and, optionally, a different token store.
    pub async fn initialize(&self, app_id: Option<&str>, token_store: Option<Store>) -> AppResult<()> {
        let app_id = app_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                AppError::Configuration("appId parameter not set in initialize()".to_string())
            })?;

        let mut inner = self.inner.lock().await;
        inner.app_id = Some(app_id.to_string());
        if let Some(store) = token_store {
            inner.token_store = store;
        }
        Ok(())
    }

    async fn token_store(&self) -> Store {
        self.inner.lock().await.token_store.clone()
    }

    async fn stored_token(&self) -> AppResult<Option<String>> {
        self.token_store().await.get_json(&StoreKey::Token).await
    }

    /// Reports `connected` when a token is stored, `unknown` otherwise.
    pub async fn get_login_status(&self) -> AppResult<LoginStatus> {
        Ok(match self.stored_token().await? {
            Some(token) => LoginStatus::connected(token),
            None => LoginStatus::unknown(),
        })
    }

    /// Opens the OAuth dialog and returns a handle for the attempt.
    ///
    /// A pending earlier attempt is resolved with [`AuthError::Superseded`].
    pub async fn login(self: &Arc<Self>, scope: &str) -> AppResult<LoginAttempt> {
        let (waiter, outcome) = oneshot::channel();
        let id = Uuid::new_v4();
        let attempt = LoginAttempt { id, outcome };
        let embedded = self.launcher.is_embedded();

        let url = {
            let mut inner = self.inner.lock().await;
            let Some(app_id) = inner.app_id.clone() else {
                tracing::warn!("Login requested before the app id was set");
                let _ = waiter.send(Ok(LoginStatus::unknown_with_error(APP_ID_MISSING)));
                return Ok(attempt);
            };

            if let Some(mut previous) = inner.pending.take() {
                if !previous.processed {
                    tracing::warn!(attempt = %previous.id, "Superseding pending login attempt");
                }
                previous.resolve(Err(AuthError::Superseded.into()));
            }
            inner.pending = Some(PendingLogin {
                id,
                processed: false,
                waiter: Some(waiter),
            });

            let redirect_uri = self.settings.oauth_redirect_url(embedded);
            format!(
                "{}?{}",
                self.settings.login_url,
                redirect::to_query_string(&[
                    ("client_id", app_id.as_str()),
                    ("redirect_uri", redirect_uri.as_str()),
                    ("response_type", "token"),
                    ("scope", scope),
                ])
            )
        };

        let started_at = Instant::now();
        let opened = match self.launcher.open(&url).await {
            Ok(opened) => opened,
            Err(e) => {
                self.forget(id).await;
                return Err(e);
            }
        };
        tracing::info!(attempt = %id, embedded, "Login dialog opened");

        if let Some(events) = opened.events {
            let auth = Arc::clone(self);
            let handle = opened.handle;
            tokio::spawn(async move {
                auth.watch_login_view(id, started_at, handle, events).await;
            });
        }

        Ok(attempt)
    }

    /// Completes the pending login from a redirect URL delivered by the callback
    /// page.
    ///
    /// Returns `None` when no attempt is waiting or the attempt was already
    /// completed by the other path.
    pub async fn oauth_callback(&self, url: &str) -> AppResult<Option<LoginStatus>> {
        self.complete(None, url).await
    }

    async fn complete(&self, attempt: Option<Uuid>, url: &str) -> AppResult<Option<LoginStatus>> {
        let mut inner = self.inner.lock().await;
        let store = inner.token_store.clone();

        let Some(pending) = inner.pending.as_mut() else {
            tracing::warn!("OAuth redirect received with no login in progress");
            return Ok(None);
        };
        if pending.processed || attempt.is_some_and(|id| id != pending.id) {
            tracing::debug!(attempt = %pending.id, "OAuth redirect already processed");
            return Ok(None);
        }
        pending.processed = true;

        let outcome = match parse_redirect(url) {
            RedirectOutcome::Token(token) => store
                .set_json(&StoreKey::Token, &token)
                .await
                .map(|()| LoginStatus::connected(token)),
            RedirectOutcome::Error(error) => Ok(LoginStatus::not_authorized(Some(error))),
            RedirectOutcome::Unrecognized => Ok(LoginStatus::not_authorized(None)),
        };

        let reply = match &outcome {
            Ok(status) => {
                tracing::info!(attempt = %pending.id, status = ?status.status, "Login completed");
                Ok(Some(status.clone()))
            }
            Err(e) => {
                tracing::error!(attempt = %pending.id, error = %e, "Failed to persist session token");
                Err(AppError::Storage(e.to_string()))
            }
        };
        pending.resolve(outcome);
        reply
    }

    async fn watch_login_view(
        self: Arc<Self>,
        attempt: Uuid,
        started_at: Instant,
        handle: Arc<dyn ViewHandle>,
        mut events: mpsc::UnboundedReceiver<ViewEvent>,
    ) {
        while let Some(event) = events.recv().await {
            match event {
                ViewEvent::LoadStart(url) if redirect::has_marker(&url) => {
                    let delay = LOGIN_CLOSE_DEBOUNCE.saturating_sub(started_at.elapsed());
                    let closer = Arc::clone(&handle);
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        closer.close();
                    });

                    if let Err(e) = self.complete(Some(attempt), &url).await {
                        tracing::error!(attempt = %attempt, error = %e, "Embedded login failed");
                    }
                }
                ViewEvent::LoadStart(url) => {
                    tracing::debug!(attempt = %attempt, url = %url, "Login view navigated");
                }
                ViewEvent::Exit => break,
            }
        }

        self.cancel(attempt).await;
    }

    /// Rejects the attempt with `user_cancelled` unless it already completed.
    async fn cancel(&self, attempt: Uuid) {
        let mut inner = self.inner.lock().await;
        if !inner.pending.as_ref().is_some_and(|p| p.id == attempt) {
            return;
        }
        if let Some(mut pending) = inner.pending.take() {
            if !pending.processed {
                tracing::info!(attempt = %attempt, "Login view closed before completion");
                pending.resolve(Err(AuthError::UserCancelled.into()));
            }
        }
    }

    async fn forget(&self, attempt: Uuid) {
        let mut inner = self.inner.lock().await;
        if inner.pending.as_ref().is_some_and(|p| p.id == attempt) {
            inner.pending = None;
        }
    }

    /// Clears the session token, then launches the provider logout page.
    ///
    /// Returns once the page is launched; it is closed after a fixed delay whether
    /// or not it finished loading.
    pub async fn logout(&self) -> AppResult<()> {
        let store = self.token_store().await;
        let token: Option<String> = store.get_json(&StoreKey::Token).await?;
        store.remove(&StoreKey::Token).await?;

        let Some(token) = token else {
            tracing::debug!("Logout without a session token");
            return Ok(());
        };

        let next = self.settings.logout_redirect_url();
        let url = format!(
            "{}?{}",
            self.settings.logout_url,
            redirect::to_query_string(&[("access_token", token.as_str()), ("next", next.as_str())])
        );

        match self.launcher.open(&url).await {
            Ok(opened) => {
                let handle = opened.handle;
                tokio::spawn(async move {
                    tokio::time::sleep(LOGOUT_CLOSE_DELAY).await;
                    handle.close();
                });
                tracing::info!("Logout page launched");
            }
            Err(e) => tracing::warn!(error = %e, "Failed to open logout page"),
        }
        Ok(())
    }

    /// De-authorizes the app and clears the session token.
    pub async fn revoke_permissions(&self) -> AppResult<()> {
        self.api_request(Method::DELETE, "/me/permissions", &[])
            .await?;
        self.token_store().await.remove(&StoreKey::Token).await?;
        tracing::info!("Facebook permissions revoked");
        Ok(())
    }

    /// Makes an authenticated Graph API request.
    ///
    /// Fails with [`AppError::NotAuthenticated`] without sending anything when no
    /// token is stored. Non-200 replies become [`AppError::Transport`] carrying the
    /// provider's `error` object, or a generic message when the body has none.
    pub async fn api_request(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
    ) -> AppResult<Value> {
        let token = self.stored_token().await?.ok_or(AppError::NotAuthenticated)?;

        let mut query: Vec<(&str, &str)> = params.to_vec();
        query.push(("access_token", token.as_str()));
        let url = format!(
            "{}{}?{}",
            self.settings.graph_api_url,
            path,
            redirect::to_query_string(&query)
        );

        let response = self.http_client.request(method.clone(), &url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::OK {
            if body.trim().is_empty() {
                return Ok(Value::Null);
            }
            return Ok(serde_json::from_str(&body)?);
        }

        let payload = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|value| value.get("error").cloned())
            .unwrap_or_else(|| json!({ "message": GENERIC_API_ERROR }));

        tracing::warn!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            "Graph API request failed"
        );

        Err(AppError::Transport {
            status: status.as_u16(),
            payload,
        })
    }
}
