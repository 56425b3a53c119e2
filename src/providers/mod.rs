/// Movie data provider abstraction
///
/// The browsing engine only talks to a listing/detail provider through this trait,
/// which keeps the themoviedb.org client swappable and lets the engine be tested
/// without network access.
use crate::{
    error::AppResult,
    models::{Credits, Genre, ListingPage, ListingQuery, MovieDetails, MovieId, VideoList},
};

pub mod backend;
pub mod tmdb;

pub use backend::{HttpBackend, SyncBackend};
pub use tmdb::TmdbProvider;

/// Trait for movie listing and detail providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MovieProvider: Send + Sync {
    /// Fetch one page of listing results
    ///
    /// `page_index` is zero-based; providers translate it to their own numbering.
    async fn listing_page(&self, query: &ListingQuery, page_index: u32) -> AppResult<ListingPage>;

    /// Fetch full details for a single movie
    async fn movie_details(&self, movie_id: MovieId) -> AppResult<MovieDetails>;

    /// Fetch the videos attached to a movie
    async fn videos(&self, movie_id: MovieId) -> AppResult<VideoList>;

    /// Fetch cast and crew for a movie
    async fn credits(&self, movie_id: MovieId) -> AppResult<Credits>;

    /// Fetch the genre catalogue
    async fn genres(&self) -> AppResult<Vec<Genre>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
