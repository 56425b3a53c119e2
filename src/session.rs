//! Signed-in user lifecycle.
//!
//! Ties the Facebook session to the sync backend: resolves the user profile,
//! registers it with the backend and downloads the user's watchlist.

use std::sync::Arc;

use reqwest::Method;

use crate::auth::{FacebookAuth, LoginStatus};
use crate::browse::MovieBrowser;
use crate::error::{AppError, AppResult};
use crate::models::UserProfile;
use crate::providers::SyncBackend;
use crate::store::{Store, StoreKey};

const PROFILE_FIELDS: &str = "id,name,email";

pub struct Session {
    auth: Arc<FacebookAuth>,
    browser: MovieBrowser,
    backend: Arc<dyn SyncBackend>,
    store: Store,
    scope: String,
}

impl Session {
    pub fn new(
        auth: Arc<FacebookAuth>,
        browser: MovieBrowser,
        backend: Arc<dyn SyncBackend>,
        store: Store,
        scope: String,
    ) -> Self {
        Self {
            auth,
            browser,
            backend,
            store,
            scope,
        }
    }

    pub async fn cached_user(&self) -> AppResult<Option<UserProfile>> {
        self.store.get_json(&StoreKey::User).await
    }

    /// Resolves the signed-in user and downloads their watchlist.
    ///
    /// With a cached user, the backend record decides whether the session is
    /// signed in; `None` means the backend does not know the user. Without one,
    /// the profile is read from Graph `/me`, cached and registered with the
    /// backend.
    pub async fn bootstrap(&self) -> AppResult<Option<UserProfile>> {
        if let Some(cached) = self.cached_user().await? {
            return match self.backend.fetch_user(&cached.id).await? {
                Some(record) => {
                    self.sign_in(&record).await?;
                    Ok(Some(record))
                }
                None => {
                    tracing::warn!(user_id = %cached.id, "Cached user has no backend record");
                    Ok(None)
                }
            };
        }

        let me = self
            .auth
            .api_request(Method::GET, "/me", &[("fields", PROFILE_FIELDS)])
            .await?;
        let user: UserProfile = serde_json::from_value(me)?;
        self.store.set_json(&StoreKey::User, &user).await?;
        self.backend.upsert_user(&user).await?;
        self.sign_in(&user).await?;
        Ok(Some(user))
    }

    async fn sign_in(&self, user: &UserProfile) -> AppResult<()> {
        self.browser.set_user(Some(user.id.clone())).await;
        let watchlist = self.backend.fetch_watchlist(&user.id).await?;
        tracing::info!(user_id = %user.id, watchlist = watchlist.len(), "User signed in");
        self.browser.replace_watchlist(watchlist).await
    }

    /// Logs in and, once connected, bootstraps the user.
    pub async fn login(&self) -> AppResult<LoginStatus> {
        let attempt = self.auth.login(&self.scope).await?;
        let status = attempt.outcome().await?;
        if status.is_connected() {
            self.bootstrap().await?;
        }
        Ok(status)
    }

    pub async fn logout(&self) -> AppResult<()> {
        self.auth.logout().await?;
        self.store.remove(&StoreKey::User).await?;
        self.browser.set_user(None).await;
        Ok(())
    }

    /// Revokes the app's permissions, then deletes the user's backend record.
    pub async fn delete_account(&self) -> AppResult<()> {
        let user = self
            .cached_user()
            .await?
            .ok_or_else(|| AppError::NotFound("No signed-in user".to_string()))?;

        self.auth.revoke_permissions().await?;
        self.backend.delete_user(&user).await?;
        self.store.remove(&StoreKey::User).await?;
        self.browser.set_user(None).await;
        tracing::info!(user_id = %user.id, "Account deleted");
        Ok(())
    }
}
