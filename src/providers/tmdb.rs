/// themoviedb.org API provider
///
/// Every request carries the API key as a query parameter.
///
/// API Flow:
/// 1. Listing: /discover/movie or /movie/popular, paginated → candidate ids
/// 2. Details: /movie/{id} → full record, validated before display
/// 3. Enrichment: /movie/{id}/videos and /movie/{id}/credits
use crate::{
    error::{AppError, AppResult},
    models::{
        Credits, Genre, GenreList, ListingPage, ListingQuery, MovieDetails, MovieId, VideoList,
    },
    providers::MovieProvider,
};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

impl TmdbProvider {
    pub fn new(api_key: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// GETs `path` with the API key plus `params` and decodes the JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> AppResult<T> {
        let url = format!("{}/{}", self.api_url, path);

        let response = self
            .http_client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let payload = serde_json::from_str(&body)
                .unwrap_or_else(|_| serde_json::Value::String(body.clone()));
            return Err(AppError::Transport {
                status: status.as_u16(),
                payload,
            });
        }

        let response_text = response.text().await?;
        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                path = %path,
                "Failed to deserialize TMDB response"
            );
            AppError::ExternalApi(format!("Failed to parse TMDB response: {}", e))
        })
    }
}

#[async_trait::async_trait]
impl MovieProvider for TmdbProvider {
    async fn listing_page(&self, query: &ListingQuery, page_index: u32) -> AppResult<ListingPage> {
        let mut params = query.params.clone();
        params.push(("page".to_string(), (page_index + 1).to_string()));

        let page: ListingPage = self.get_json(query.endpoint.path(), &params).await?;

        tracing::debug!(
            query = %query,
            page = page_index,
            results = page.results.len(),
            total_pages = page.total_pages,
            provider = "tmdb",
            "Listing page fetched"
        );

        Ok(page)
    }

    async fn movie_details(&self, movie_id: MovieId) -> AppResult<MovieDetails> {
        let details: MovieDetails = self.get_json(&format!("movie/{}", movie_id), &[]).await?;

        tracing::info!(
            movie_id = movie_id,
            title = %details.title,
            provider = "tmdb",
            "Movie details fetched"
        );

        Ok(details)
    }

    async fn videos(&self, movie_id: MovieId) -> AppResult<VideoList> {
        self.get_json(&format!("movie/{}/videos", movie_id), &[])
            .await
    }

    async fn credits(&self, movie_id: MovieId) -> AppResult<Credits> {
        self.get_json(&format!("movie/{}/credits", movie_id), &[])
            .await
    }

    async fn genres(&self) -> AppResult<Vec<Genre>> {
        let list: GenreList = self.get_json("genre/movie/list", &[]).await?;
        Ok(list.genres)
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}
