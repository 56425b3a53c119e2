/// Backend sync store client
///
/// The backend keeps one user record per Facebook id and a wholesale copy of the
/// user's watchlist. Every watchlist mutation replaces the stored snapshot.
use crate::{
    error::{AppError, AppResult},
    models::{Movie, UserProfile, WatchlistRecord},
};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SyncBackend: Send + Sync {
    /// Look up the stored record for a user id
    async fn fetch_user(&self, user_id: &str) -> AppResult<Option<UserProfile>>;

    /// Create or update the user record
    async fn upsert_user(&self, user: &UserProfile) -> AppResult<()>;

    /// Download the user's watchlist snapshot
    async fn fetch_watchlist(&self, user_id: &str) -> AppResult<Vec<Movie>>;

    /// Replace the user's watchlist snapshot
    async fn replace_watchlist(&self, user_id: &str, movies: Vec<Movie>) -> AppResult<()>;

    /// Delete the user's account and data
    async fn delete_user(&self, user: &UserProfile) -> AppResult<()>;
}

#[derive(Clone)]
pub struct HttpBackend {
    http_client: HttpClient,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn check(response: reqwest::Response) -> AppResult<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let payload =
            serde_json::from_str(&body).unwrap_or_else(|_| serde_json::Value::String(body.clone()));
        Err(AppError::Transport {
            status: status.as_u16(),
            payload,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        let response = self.http_client.get(self.url(path)).send().await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    async fn post_json<B: serde::Serialize + ?Sized>(&self, path: &str, body: &B) -> AppResult<()> {
        let response = self.http_client.post(self.url(path)).json(body).send().await?;
        let response = Self::check(response).await?;
        let reply = response.text().await.unwrap_or_default();
        tracing::debug!(path = %path, reply = %reply, "Backend write acknowledged");
        Ok(())
    }
}

#[async_trait::async_trait]
impl SyncBackend for HttpBackend {
    async fn fetch_user(&self, user_id: &str) -> AppResult<Option<UserProfile>> {
        let records: Vec<UserProfile> = self.get_json(&format!("user/{}", user_id)).await?;
        Ok(records.into_iter().next())
    }

    async fn upsert_user(&self, user: &UserProfile) -> AppResult<()> {
        self.post_json("user", user).await?;
        tracing::info!(user_id = %user.id, "User record synchronized");
        Ok(())
    }

    async fn fetch_watchlist(&self, user_id: &str) -> AppResult<Vec<Movie>> {
        let records: Vec<WatchlistRecord> =
            self.get_json(&format!("watchlist/{}", user_id)).await?;
        Ok(records
            .into_iter()
            .next()
            .map(|record| record.results)
            .unwrap_or_default())
    }

    async fn replace_watchlist(&self, user_id: &str, movies: Vec<Movie>) -> AppResult<()> {
        let count = movies.len();
        let record = WatchlistRecord {
            uid: user_id.to_string(),
            results: movies,
        };
        self.post_json("watchlist", &record).await?;
        tracing::info!(user_id = %user_id, movies = count, "Watchlist synchronized");
        Ok(())
    }

    async fn delete_user(&self, user: &UserProfile) -> AppResult<()> {
        self.post_json("deluser", user).await?;
        tracing::info!(user_id = %user.id, "User record deleted");
        Ok(())
    }
}
