//! Movie browsing engine.
//!
//! Listing pages are loaded into an in-memory candidate pool for the current
//! filters; movies are drawn from the pool at random, validated, cached in the
//! recent movies list and enriched with trailer and credits in the background.
//! The watchlist is persisted locally and mirrored to the sync backend.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use rand::Rng;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{build_query, Credits, Filters, Genre, ListingQuery, Movie, MovieId, UserProfile};
use crate::providers::{MovieProvider, SyncBackend};
use crate::store::{Store, StoreKey};

pub mod pagination;
pub mod recent;
pub mod watchlist;

pub use pagination::{PageProgress, Paginator};
pub use recent::RecentMovies;
pub use watchlist::Watchlist;

/// Pages added to the limit each time the user asks for something new
const EXTRA_PAGES: u32 = 6;
/// Draws attempted before giving up on rejected or failing movies
const MAX_DRAW_ATTEMPTS: usize = 10;

#[derive(Debug, Clone)]
pub struct BrowseSettings {
    pub max_pages: u32,
    pub initial_pages: u32,
    pub recent_capacity: usize,
    pub image_base_url: String,
}

impl BrowseSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_pages: config.max_pages,
            initial_pages: config.initial_pages,
            recent_capacity: config.recent_capacity,
            image_base_url: config.tmdb_image_url.trim_end_matches('/').to_string(),
        }
    }
}

struct BrowseState {
    filters: Filters,
    pool: Vec<MovieId>,
    paginator: Paginator,
    loader: Option<JoinHandle<()>>,
    recent: RecentMovies,
    watchlist: Watchlist,
    user_id: Option<String>,
    current: Option<MovieId>,
    /// Sequence number of the latest watchlist snapshot handed to the backend
    sync_seq: u64,
}

/// A movie ready to show. Trailer and credits arrive later.
#[derive(Debug)]
pub struct RenderedMovie {
    pub movie: Movie,
    pub on_watchlist: bool,
    trailer: JoinHandle<Option<String>>,
    credits: JoinHandle<Option<Credits>>,
}

impl RenderedMovie {
    /// Waits for the trailer and credits lookups and returns the movie with
    /// whatever they found.
    pub async fn enriched(self) -> Movie {
        let mut movie = self.movie;
        if let Ok(Some(trailer)) = self.trailer.await {
            movie.trailer = Some(trailer);
        }
        if let Ok(Some(credits)) = self.credits.await {
            if let Some(director) = credits.director() {
                movie.director = Some(director);
            }
            movie.actors = credits.actors();
        }
        movie
    }
}

/// Result of a watchlist mutation
#[derive(Debug)]
pub struct WatchlistUpdate {
    pub changed: bool,
    sync: Option<JoinHandle<()>>,
}

impl WatchlistUpdate {
    fn unchanged() -> Self {
        Self {
            changed: false,
            sync: None,
        }
    }

    /// Waits for the backend sync, if one was started. Sync failures are only
    /// logged.
    pub async fn synced(self) {
        if let Some(sync) = self.sync {
            let _ = sync.await;
        }
    }
}

#[derive(Clone)]
pub struct MovieBrowser {
    provider: Arc<dyn MovieProvider>,
    backend: Arc<dyn SyncBackend>,
    store: Store,
    settings: Arc<BrowseSettings>,
    state: Arc<Mutex<BrowseState>>,
    /// Sequence number of the last snapshot sent; held while a sync is in flight
    synced_seq: Arc<Mutex<u64>>,
}

impl MovieBrowser {
    pub fn new(
        provider: Arc<dyn MovieProvider>,
        backend: Arc<dyn SyncBackend>,
        store: Store,
        settings: BrowseSettings,
    ) -> Self {
        let state = BrowseState {
            filters: Filters::default(),
            pool: Vec::new(),
            paginator: Paginator::new(settings.max_pages, settings.initial_pages),
            loader: None,
            recent: RecentMovies::new(settings.recent_capacity),
            watchlist: Watchlist::default(),
            user_id: None,
            current: None,
            sync_seq: 0,
        };

        Self {
            provider,
            backend,
            store,
            settings: Arc::new(settings),
            state: Arc::new(Mutex::new(state)),
            synced_seq: Arc::new(Mutex::new(0)),
        }
    }

    /// Restores filters, recent movies, watchlist and signed-in user from the
    /// store.
    pub async fn load(&self) -> AppResult<()> {
        let genres: BTreeMap<u32, bool> = self
            .store
            .get_json(&StoreKey::SelectedGenres)
            .await?
            .unwrap_or_default();
        let from_date: Option<NaiveDate> = self.store.get_json(&StoreKey::FromDate).await?;
        let to_date: Option<NaiveDate> = self.store.get_json(&StoreKey::ToDate).await?;
        let recent_ids: Vec<MovieId> = self
            .store
            .get_json(&StoreKey::RecentIds)
            .await?
            .unwrap_or_default();
        let recent_details: Vec<Movie> = self
            .store
            .get_json(&StoreKey::RecentDetails)
            .await?
            .unwrap_or_default();
        let watchlist: Vec<Movie> = self
            .store
            .get_json(&StoreKey::WatchlistDetails)
            .await?
            .unwrap_or_default();
        let user: Option<UserProfile> = self.store.get_json(&StoreKey::User).await?;

        let mut state = self.state.lock().await;
        state.filters = Filters {
            genres,
            from_date,
            to_date,
        };
        state.recent =
            RecentMovies::restore(&recent_ids, recent_details, self.settings.recent_capacity);
        state.watchlist = Watchlist::new(watchlist);
        state.user_id = user.map(|user| user.id);
        state.current = state.recent.get_index(0).map(|movie| movie.id);
        self.invalidate(&mut state);

        tracing::info!(
            recent = state.recent.len(),
            watchlist = state.watchlist.len(),
            "Browsing state restored"
        );
        Ok(())
    }

    /// Drops the candidate pool and restarts pagination.
    fn invalidate(&self, state: &mut BrowseState) {
        if let Some(loader) = state.loader.take() {
            loader.abort();
        }
        state.pool.clear();
        state
            .paginator
            .reset(self.settings.max_pages, self.settings.initial_pages);
    }

    // Filters

    pub async fn filters(&self) -> Filters {
        self.state.lock().await.filters.clone()
    }

    /// Listing query for the current filters
    pub async fn query(&self) -> ListingQuery {
        build_query(&self.state.lock().await.filters)
    }

    pub async fn set_genre(&self, genre_id: u32, selected: bool) -> AppResult<()> {
        let genres = {
            let mut state = self.state.lock().await;
            state.filters.genres.insert(genre_id, selected);
            self.invalidate(&mut state);
            state.filters.genres.clone()
        };
        tracing::debug!(genre_id, selected, "Genre filter changed");
        self.store.set_json(&StoreKey::SelectedGenres, &genres).await
    }

    pub async fn set_release_dates(
        &self,
        from_date: Option<NaiveDate>,
        to_date: Option<NaiveDate>,
    ) -> AppResult<()> {
        if let (Some(from), Some(to)) = (from_date, to_date) {
            if from > to {
                return Err(AppError::InvalidInput(format!(
                    "Release date range is empty: {} is after {}",
                    from, to
                )));
            }
        }

        {
            let mut state = self.state.lock().await;
            state.filters.from_date = from_date;
            state.filters.to_date = to_date;
            self.invalidate(&mut state);
        }
        self.persist_date(StoreKey::FromDate, from_date).await?;
        self.persist_date(StoreKey::ToDate, to_date).await
    }

    async fn persist_date(&self, key: StoreKey, date: Option<NaiveDate>) -> AppResult<()> {
        match date {
            Some(date) => self.store.set_json(&key, &date).await,
            None => self.store.remove(&key).await,
        }
    }

    pub async fn reset_genres(&self) -> AppResult<()> {
        {
            let mut state = self.state.lock().await;
            state.filters.genres.clear();
            self.invalidate(&mut state);
        }
        self.store.remove(&StoreKey::SelectedGenres).await
    }

    pub async fn clear_filters(&self) -> AppResult<()> {
        {
            let mut state = self.state.lock().await;
            state.filters = Filters::default();
            self.invalidate(&mut state);
        }
        for key in [StoreKey::SelectedGenres, StoreKey::FromDate, StoreKey::ToDate] {
            self.store.remove(&key).await?;
        }
        tracing::info!("Filters cleared");
        Ok(())
    }

    /// Genre catalogue, fetched once and then served from the store
    pub async fn genres(&self) -> AppResult<Vec<Genre>> {
        crate::stored!(self.store, StoreKey::Genres, self.provider.genres())
    }

    /// Names of the selected genres, in catalogue order
    pub async fn selected_genre_names(&self) -> AppResult<Vec<String>> {
        let selected = self.filters().await.selected_genres();
        Ok(self
            .genres()
            .await?
            .into_iter()
            .filter(|genre| selected.contains(&genre.id))
            .map(|genre| genre.name)
            .collect())
    }

    // Pagination

    /// Fetches one listing page into the candidate pool.
    ///
    /// Failures on the initial pages come back as retryable
    /// [`AppError::PageFetch`] errors; later failures stop pagination.
    pub async fn fetch_page(&self, index: u32) -> AppResult<PageProgress> {
        let (query, generation) = {
            let state = self.state.lock().await;
            (build_query(&state.filters), state.paginator.generation())
        };

        let result = self.provider.listing_page(&query, index).await;

        let mut state = self.state.lock().await;
        if state.paginator.generation() != generation {
            tracing::debug!(page = index, "Discarding page fetched for outdated filters");
            return Ok(PageProgress::Stale);
        }

        match result {
            Ok(page) => {
                let progress = state.paginator.record_page(index, page.total_pages);
                if let PageProgress::Loaded { .. } = progress {
                    state.pool.extend(page.ids());
                    tracing::debug!(page = index, pool = state.pool.len(), "Listing page loaded");
                }
                Ok(progress)
            }
            Err(e) if state.paginator.is_initial(index) => {
                tracing::warn!(page = index, error = %e, "Initial listing page failed");
                Err(AppError::PageFetch {
                    page: index,
                    source: Box::new(e),
                })
            }
            Err(e) => {
                tracing::warn!(page = index, error = %e, "Listing page failed, stopping pagination");
                state.paginator.stop();
                Ok(PageProgress::Stopped)
            }
        }
    }

    /// Loads pages until the initial threshold, draws the first movie and keeps
    /// loading the remaining pages in the background.
    ///
    /// After a retryable failure, calling this again resumes at the failed page.
    pub async fn load_candidates(&self) -> AppResult<RenderedMovie> {
        let query = self.query().await;
        tracing::info!(query = %query, "Loading candidate movies");

        loop {
            let next = {
                let mut state = self.state.lock().await;
                if state.paginator.initial_loaded() {
                    self.spawn_loader(&mut state);
                    break;
                }
                state.paginator.next_page()
            };
            let Some(index) = next else { break };

            match self.fetch_page(index).await? {
                PageProgress::Loaded {
                    reached_initial: true,
                } => {
                    let mut state = self.state.lock().await;
                    self.spawn_loader(&mut state);
                    break;
                }
                PageProgress::Loaded { .. } => continue,
                _ => break,
            }
        }

        self.draw(None).await
    }

    /// Fetches the remaining pages in order. Returns the number of pages loaded.
    pub async fn drain_pages(&self) -> AppResult<u32> {
        let mut loaded = 0;
        loop {
            let next = self.state.lock().await.paginator.next_page();
            let Some(index) = next else { break };
            match self.fetch_page(index).await? {
                PageProgress::Loaded { .. } => loaded += 1,
                _ => break,
            }
        }
        tracing::debug!(pages = loaded, "Page loading finished");
        Ok(loaded)
    }

    fn spawn_loader(&self, state: &mut BrowseState) {
        if state.loader.as_ref().is_some_and(|loader| !loader.is_finished()) {
            return;
        }
        let browser = self.clone();
        state.loader = Some(tokio::spawn(async move {
            if let Err(e) = browser.drain_pages().await {
                tracing::warn!(error = %e, "Background page loading failed");
            }
        }));
    }

    /// Stops background pagination after the page in flight.
    pub async fn stop_loading(&self) {
        let mut state = self.state.lock().await;
        state.paginator.stop();
        if let Some(loader) = state.loader.take() {
            loader.abort();
        }
    }

    /// Waits for background pagination to finish.
    pub async fn finish_loading(&self) {
        let loader = self.state.lock().await.loader.take();
        if let Some(loader) = loader {
            let _ = loader.await;
        }
    }

    pub async fn pool_size(&self) -> usize {
        self.state.lock().await.pool.len()
    }

    // Draws

    /// Shows `forced`, or a random candidate, redrawing when a movie is rejected
    /// or its details cannot be fetched.
    pub async fn draw(&self, forced: Option<MovieId>) -> AppResult<RenderedMovie> {
        let mut forced = forced;
        let mut last_error = AppError::EmptyPool;

        for attempt in 1..=MAX_DRAW_ATTEMPTS {
            let movie_id = match forced.take() {
                Some(movie_id) => movie_id,
                None => self.pick_candidate().await?,
            };

            match self.fetch_details(movie_id).await {
                Ok(rendered) => return Ok(rendered),
                Err(e @ AppError::ContentValidation { .. }) => {
                    tracing::info!(movie_id, attempt, reason = %e, "Movie rejected, drawing again");
                    last_error = e;
                }
                Err(e) => {
                    tracing::warn!(movie_id, attempt, error = %e, "Failed to load movie, drawing again");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    async fn pick_candidate(&self) -> AppResult<MovieId> {
        let state = self.state.lock().await;
        if state.pool.is_empty() {
            return Err(AppError::EmptyPool);
        }
        let index = rand::rng().random_range(0..state.pool.len());
        Ok(state.pool[index])
    }

    /// Shows a movie from the recent cache, or fetches and validates it.
    ///
    /// Adult and unreleased movies are removed from the candidate pool and
    /// reported as [`AppError::ContentValidation`].
    pub async fn fetch_details(&self, movie_id: MovieId) -> AppResult<RenderedMovie> {
        let cached = {
            let mut state = self.state.lock().await;
            let cached = state.recent.promote(movie_id).cloned();
            if cached.is_some() {
                state.current = Some(movie_id);
            }
            cached
        };
        if let Some(movie) = cached {
            tracing::debug!(movie_id, "Showing movie from the recent cache");
            self.persist_recent().await?;
            return Ok(self.render(movie).await);
        }

        let details = self.provider.movie_details(movie_id).await?;
        if let Err(reason) = details.validate() {
            let mut state = self.state.lock().await;
            state.pool.retain(|id| *id != movie_id);
            return Err(AppError::ContentValidation {
                id: movie_id,
                reason,
            });
        }

        let movie = Movie::from_details(details, &self.settings.image_base_url);
        {
            let mut state = self.state.lock().await;
            state.recent.push_front(movie.clone());
            state.current = Some(movie_id);
        }
        self.persist_recent().await?;

        tracing::info!(movie_id, title = %movie.title, "Movie loaded");
        Ok(self.render(movie).await)
    }

    async fn render(&self, movie: Movie) -> RenderedMovie {
        let on_watchlist = self.state.lock().await.watchlist.contains(movie.id);
        RenderedMovie {
            trailer: self.spawn_trailer(movie.id),
            credits: self.spawn_credits(movie.id),
            movie,
            on_watchlist,
        }
    }

    fn spawn_trailer(&self, movie_id: MovieId) -> JoinHandle<Option<String>> {
        let browser = self.clone();
        tokio::spawn(async move {
            let videos = match browser.provider.videos(movie_id).await {
                Ok(videos) => videos,
                Err(e) => {
                    tracing::warn!(movie_id, error = %e, "Failed to fetch trailer");
                    return None;
                }
            };
            let key = videos.trailer_key()?;
            browser
                .merge(movie_id, |movie| movie.trailer = Some(key.clone()))
                .await;
            Some(key)
        })
    }

    fn spawn_credits(&self, movie_id: MovieId) -> JoinHandle<Option<Credits>> {
        let browser = self.clone();
        tokio::spawn(async move {
            let credits = match browser.provider.credits(movie_id).await {
                Ok(credits) => credits,
                Err(e) => {
                    tracing::warn!(movie_id, error = %e, "Failed to fetch credits");
                    return None;
                }
            };
            let director = credits.director();
            let actors = credits.actors();
            browser
                .merge(movie_id, |movie| {
                    if director.is_some() {
                        movie.director = director.clone();
                    }
                    movie.actors = actors.clone();
                })
                .await;
            Some(credits)
        })
    }

    /// Applies late-arriving data to the cached copy of a movie.
    async fn merge(&self, movie_id: MovieId, update: impl FnOnce(&mut Movie)) {
        let updated = self.state.lock().await.recent.update(movie_id, update);
        if updated {
            if let Err(e) = self.persist_recent().await {
                tracing::warn!(movie_id, error = %e, "Failed to persist movie enrichment");
            }
        }
    }

    async fn persist_recent(&self) -> AppResult<()> {
        let (ids, movies) = {
            let state = self.state.lock().await;
            (state.recent.ids(), state.recent.movies().to_vec())
        };
        self.store.set_json(&StoreKey::RecentIds, &ids).await?;
        self.store.set_json(&StoreKey::RecentDetails, &movies).await
    }

    /// Draws again from a larger pool: six more pages are loaded in the
    /// background.
    pub async fn gimme_new(&self) -> AppResult<RenderedMovie> {
        {
            let mut state = self.state.lock().await;
            state.paginator.extend(EXTRA_PAGES);
            self.spawn_loader(&mut state);
        }
        self.draw(None).await
    }

    /// Shows the movie that was on screen before the current one.
    pub async fn previous(&self) -> AppResult<RenderedMovie> {
        let previous = self
            .state
            .lock()
            .await
            .recent
            .get_index(1)
            .map(|movie| movie.id)
            .ok_or_else(|| AppError::NotFound("No previously shown movie".to_string()))?;
        self.draw(Some(previous)).await
    }

    /// Shows a movie from the recent cache or the watchlist without fetching
    /// its details.
    pub async fn open_movie(&self, movie_id: MovieId) -> AppResult<RenderedMovie> {
        let movie = {
            let mut state = self.state.lock().await;
            let promoted = state.recent.promote(movie_id).cloned();
            let movie = match promoted {
                Some(movie) => movie,
                None => {
                    let movie = state.watchlist.get(movie_id).cloned().ok_or_else(|| {
                        AppError::NotFound(format!("Movie {} is not in recent movies or the watchlist", movie_id))
                    })?;
                    state.recent.push_front(movie.clone());
                    movie
                }
            };
            state.current = Some(movie_id);
            movie
        };

        self.persist_recent().await?;
        Ok(self.render(movie).await)
    }

    pub async fn current_movie(&self) -> Option<Movie> {
        let state = self.state.lock().await;
        state.current.and_then(|id| state.recent.get(id).cloned())
    }

    pub async fn recent_movies(&self) -> Vec<Movie> {
        self.state.lock().await.recent.movies().to_vec()
    }

    // Watchlist

    pub async fn watchlist(&self) -> Vec<Movie> {
        self.state.lock().await.watchlist.movies().to_vec()
    }

    pub async fn is_on_watchlist(&self, movie_id: MovieId) -> bool {
        self.state.lock().await.watchlist.contains(movie_id)
    }

    /// Saves a shown movie to the watchlist and syncs the whole list.
    pub async fn add_to_watchlist(&self, movie_id: MovieId) -> AppResult<WatchlistUpdate> {
        let (snapshot, user_id, seq) = {
            let mut state = self.state.lock().await;
            let movie = state.recent.get(movie_id).cloned().ok_or_else(|| {
                AppError::NotFound(format!("Movie {} has not been shown", movie_id))
            })?;
            if !state.watchlist.add(movie) {
                return Ok(WatchlistUpdate::unchanged());
            }
            state.sync_seq += 1;
            (state.watchlist.clone(), state.user_id.clone(), state.sync_seq)
        };

        self.persist_watchlist(&snapshot).await?;
        tracing::info!(movie_id, size = snapshot.len(), "Added to watchlist");
        Ok(WatchlistUpdate {
            changed: true,
            sync: self.spawn_sync(user_id, snapshot, seq),
        })
    }

    pub async fn remove_from_watchlist(&self, movie_id: MovieId) -> AppResult<WatchlistUpdate> {
        let (snapshot, user_id, seq) = {
            let mut state = self.state.lock().await;
            if !state.watchlist.remove(movie_id) {
                return Ok(WatchlistUpdate::unchanged());
            }
            state.sync_seq += 1;
            (state.watchlist.clone(), state.user_id.clone(), state.sync_seq)
        };

        self.persist_watchlist(&snapshot).await?;
        tracing::info!(movie_id, size = snapshot.len(), "Removed from watchlist");
        Ok(WatchlistUpdate {
            changed: true,
            sync: self.spawn_sync(user_id, snapshot, seq),
        })
    }

    /// Replaces the local watchlist with a downloaded copy. Nothing is synced
    /// back.
    pub async fn replace_watchlist(&self, movies: Vec<Movie>) -> AppResult<()> {
        let snapshot = {
            let mut state = self.state.lock().await;
            state.watchlist = Watchlist::new(movies);
            state.watchlist.clone()
        };
        self.persist_watchlist(&snapshot).await
    }

    /// Sets the user whose backend watchlist mutations are synced to.
    pub async fn set_user(&self, user_id: Option<String>) {
        self.state.lock().await.user_id = user_id;
    }

    async fn persist_watchlist(&self, watchlist: &Watchlist) -> AppResult<()> {
        self.store
            .set_json(&StoreKey::WatchlistIds, &watchlist.ids())
            .await?;
        self.store
            .set_json(&StoreKey::WatchlistDetails, watchlist.movies())
            .await
    }

    /// Sends a snapshot to the backend. Snapshots go out one at a time in the
    /// order they were taken; one that finds a newer snapshot already sent is
    /// dropped.
    fn spawn_sync(
        &self,
        user_id: Option<String>,
        snapshot: Watchlist,
        seq: u64,
    ) -> Option<JoinHandle<()>> {
        let Some(user_id) = user_id else {
            tracing::debug!("No signed-in user, watchlist kept locally");
            return None;
        };

        let backend = Arc::clone(&self.backend);
        let synced_seq = Arc::clone(&self.synced_seq);
        Some(tokio::spawn(async move {
            let mut synced = synced_seq.lock().await;
            if *synced > seq {
                tracing::debug!(seq, latest = *synced, "Skipping outdated watchlist snapshot");
                return;
            }
            if let Err(e) = backend
                .replace_watchlist(&user_id, snapshot.movies().to_vec())
                .await
            {
                tracing::warn!(user_id = %user_id, error = %e, "Watchlist sync failed");
            }
            *synced = seq;
        }))
    }

    // Local data

    /// Wipes all browsing data, keeping the signed-in session.
    pub async fn clear_all_data(&self) -> AppResult<()> {
        let token: Option<String> = self.store.get_json(&StoreKey::Token).await?;
        let user: Option<UserProfile> = self.store.get_json(&StoreKey::User).await?;

        {
            let mut state = self.state.lock().await;
            state.filters = Filters::default();
            state.recent.clear();
            state.watchlist = Watchlist::default();
            state.current = None;
            self.invalidate(&mut state);
        }

        self.store.clear().await?;
        if let Some(token) = token {
            self.store.set_json(&StoreKey::Token, &token).await?;
        }
        if let Some(user) = user {
            self.store.set_json(&StoreKey::User, &user).await?;
        }
        tracing::info!("Local data cleared");
        Ok(())
    }

    pub async fn storage_usage_mb(&self) -> AppResult<f64> {
        self.store.usage_mb().await
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{details, movie};
    use super::*;
    use crate::models::{CastMember, CrewMember, ListingEndpoint, ListingPage, VideoList};
    use crate::providers::backend::MockSyncBackend;
    use crate::providers::MockMovieProvider;
    use std::sync::Mutex as StdMutex;

    fn settings() -> BrowseSettings {
        BrowseSettings {
            max_pages: 12,
            initial_pages: 6,
            recent_capacity: 200,
            image_base_url: "https://image.tmdb.org/t/p".to_string(),
        }
    }

    fn listing(page: u32, ids: &[MovieId], total_pages: u32) -> ListingPage {
        let results: Vec<_> = ids.iter().map(|id| serde_json::json!({ "id": id })).collect();
        serde_json::from_value(serde_json::json!({
            "page": page,
            "results": results,
            "total_pages": total_pages,
        }))
        .unwrap()
    }

    fn quiet_enrichment(provider: &mut MockMovieProvider) {
        provider
            .expect_videos()
            .returning(|_| Ok(VideoList::default()));
        provider
            .expect_credits()
            .returning(|_| Ok(Credits::default()));
    }

    fn create_browser(provider: MockMovieProvider, backend: MockSyncBackend) -> (MovieBrowser, Store) {
        let store = Store::in_memory();
        let browser = MovieBrowser::new(
            Arc::new(provider),
            Arc::new(backend),
            store.clone(),
            settings(),
        );
        (browser, store)
    }

    async fn seed_recent(browser: &MovieBrowser, ids: &[MovieId]) {
        let mut state = browser.state.lock().await;
        for id in ids.iter().rev() {
            state.recent.push_front(movie(*id));
        }
    }

    async fn assert_recent_consistent(browser: &MovieBrowser, store: &Store, first: MovieId) {
        let recent = browser.recent_movies().await;
        assert_eq!(recent[0].id, first);

        let ids: Vec<MovieId> = store.get_json(&StoreKey::RecentIds).await.unwrap().unwrap();
        let details: Vec<Movie> = store
            .get_json(&StoreKey::RecentDetails)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ids.len(), details.len());
        assert_eq!(ids[0], first);
        assert!(ids.iter().zip(&details).all(|(id, movie)| *id == movie.id));
    }

    #[tokio::test]
    async fn test_load_candidates_draws_after_initial_pages() {
        let mut provider = MockMovieProvider::new();
        provider
            .expect_listing_page()
            .returning(|_, index| {
                let base = (index as MovieId + 1) * 100;
                Ok(listing(index + 1, &[base + 1, base + 2, base + 3], 3))
            });
        provider
            .expect_movie_details()
            .returning(|id| Ok(details(id)));
        quiet_enrichment(&mut provider);
        let (browser, store) = create_browser(provider, MockSyncBackend::new());

        let rendered = browser.load_candidates().await.unwrap();
        browser.finish_loading().await;

        assert_eq!(browser.pool_size().await, 9);
        assert!(rendered.movie.id > 100 && rendered.movie.id < 400);
        assert!(!rendered.on_watchlist);
        assert_recent_consistent(&browser, &store, rendered.movie.id).await;
    }

    #[tokio::test]
    async fn test_load_candidates_runs_on_spawned_task() {
        let mut provider = MockMovieProvider::new();
        provider
            .expect_listing_page()
            .returning(|_, _| Ok(listing(1, &[7], 1)));
        provider
            .expect_movie_details()
            .returning(|id| Ok(details(id)));
        quiet_enrichment(&mut provider);
        let (browser, _store) = create_browser(provider, MockSyncBackend::new());

        let worker = browser.clone();
        let rendered = tokio::spawn(async move { worker.load_candidates().await })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(rendered.movie.id, 7);
        assert_eq!(browser.current_movie().await.map(|m| m.id), Some(7));
    }

    #[tokio::test]
    async fn test_empty_listing_reports_empty_pool() {
        let mut provider = MockMovieProvider::new();
        provider
            .expect_listing_page()
            .times(1)
            .returning(|_, _| Ok(listing(1, &[], 0)));
        let (browser, _store) = create_browser(provider, MockSyncBackend::new());

        let err = browser.load_candidates().await.unwrap_err();
        assert!(matches!(err, AppError::EmptyPool));
    }

    #[tokio::test]
    async fn test_initial_page_failure_is_retryable() {
        let calls = Arc::new(StdMutex::new(0));
        let counter = Arc::clone(&calls);
        let mut provider = MockMovieProvider::new();
        provider.expect_listing_page().returning(move |_, index| {
            let mut calls = counter.lock().unwrap();
            *calls += 1;
            if *calls == 1 {
                return Err(AppError::Transport {
                    status: 503,
                    payload: serde_json::json!("unavailable"),
                });
            }
            Ok(listing(index + 1, &[7], 1))
        });
        provider
            .expect_movie_details()
            .returning(|id| Ok(details(id)));
        quiet_enrichment(&mut provider);
        let (browser, _store) = create_browser(provider, MockSyncBackend::new());

        let err = browser.load_candidates().await.unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(err, AppError::PageFetch { page: 0, .. }));

        let rendered = browser.load_candidates().await.unwrap();
        assert_eq!(rendered.movie.id, 7);
    }

    #[tokio::test]
    async fn test_later_page_failure_stops_pagination() {
        let mut provider = MockMovieProvider::new();
        provider.expect_listing_page().returning(|_, index| {
            if index == 3 {
                return Err(AppError::ExternalApi("boom".to_string()));
            }
            Ok(listing(index + 1, &[index as MovieId + 1], 50))
        });
        let browser_settings = BrowseSettings {
            initial_pages: 1,
            ..settings()
        };
        let browser = MovieBrowser::new(
            Arc::new(provider),
            Arc::new(MockSyncBackend::new()),
            Store::in_memory(),
            browser_settings,
        );

        for index in 0..3 {
            assert!(matches!(
                browser.fetch_page(index).await.unwrap(),
                PageProgress::Loaded { .. }
            ));
        }
        assert_eq!(browser.fetch_page(3).await.unwrap(), PageProgress::Stopped);
        assert_eq!(browser.drain_pages().await.unwrap(), 0);
        assert_eq!(browser.pool_size().await, 3);
    }

    #[tokio::test]
    async fn test_filter_change_discards_pool_and_inflight_pages() {
        let mut provider = MockMovieProvider::new();
        provider
            .expect_listing_page()
            .returning(|_, index| Ok(listing(index + 1, &[1, 2, 3], 10)));
        let (browser, store) = create_browser(provider, MockSyncBackend::new());

        browser.fetch_page(0).await.unwrap();
        assert_eq!(browser.pool_size().await, 3);
        assert_eq!(browser.query().await.endpoint, ListingEndpoint::Popular);

        browser.set_genre(28, true).await.unwrap();
        assert_eq!(browser.pool_size().await, 0);
        assert_eq!(browser.query().await.endpoint, ListingEndpoint::Discover);

        let stored: BTreeMap<u32, bool> = store
            .get_json(&StoreKey::SelectedGenres)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.get(&28), Some(&true));
    }

    #[tokio::test]
    async fn test_cached_draw_moves_to_front_without_fetch() {
        let mut provider = MockMovieProvider::new();
        provider.expect_movie_details().times(0);
        quiet_enrichment(&mut provider);
        let (browser, store) = create_browser(provider, MockSyncBackend::new());
        seed_recent(&browser, &[10, 20, 30]).await;

        let rendered = browser.draw(Some(30)).await.unwrap();

        assert_eq!(rendered.movie.id, 30);
        let ids: Vec<MovieId> = browser.recent_movies().await.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![30, 10, 20]);
        assert_recent_consistent(&browser, &store, 30).await;
    }

    #[tokio::test]
    async fn test_rejected_movie_is_stripped_and_redrawn() {
        let mut provider = MockMovieProvider::new();
        provider.expect_movie_details().returning(|id| {
            let mut record = details(id);
            if id == 1 {
                record.adult = true;
            }
            Ok(record)
        });
        quiet_enrichment(&mut provider);
        let (browser, store) = create_browser(provider, MockSyncBackend::new());
        browser.state.lock().await.pool = vec![1, 2];

        let rendered = browser.draw(Some(1)).await.unwrap();

        assert_eq!(rendered.movie.id, 2);
        assert_eq!(browser.state.lock().await.pool, vec![2]);
        assert_recent_consistent(&browser, &store, 2).await;
        assert!(browser.recent_movies().await.iter().all(|m| m.id != 1));
    }

    #[tokio::test]
    async fn test_unreleased_movie_with_empty_pool() {
        let mut provider = MockMovieProvider::new();
        provider.expect_movie_details().returning(|id| {
            let mut record = details(id);
            record.status = Some("Post Production".to_string());
            Ok(record)
        });
        let (browser, _store) = create_browser(provider, MockSyncBackend::new());
        browser.state.lock().await.pool = vec![5];

        let err = browser.draw(None).await.unwrap_err();
        assert!(matches!(err, AppError::EmptyPool));
        assert!(browser.recent_movies().await.is_empty());
    }

    #[tokio::test]
    async fn test_enrichment_merges_into_recent_cache() {
        let mut provider = MockMovieProvider::new();
        provider
            .expect_movie_details()
            .returning(|id| Ok(details(id)));
        provider.expect_videos().returning(|_| {
            Ok(serde_json::from_value(serde_json::json!({
                "results": [{"key": "dQw4w9WgXcQ", "site": "YouTube"}]
            }))
            .unwrap())
        });
        provider.expect_credits().returning(|_| {
            Ok(Credits {
                cast: vec![CastMember {
                    name: "Keanu Reeves".to_string(),
                }],
                crew: vec![CrewMember {
                    name: "Lana Wachowski".to_string(),
                    job: "Director".to_string(),
                }],
            })
        });
        let (browser, _store) = create_browser(provider, MockSyncBackend::new());

        let movie = browser.draw(Some(603)).await.unwrap().enriched().await;

        assert_eq!(movie.trailer.as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(movie.director.as_deref(), Some("Lana Wachowski"));
        assert_eq!(movie.actors, vec!["Keanu Reeves".to_string()]);

        let cached = browser.current_movie().await.unwrap();
        assert_eq!(cached.trailer, movie.trailer);
        assert_eq!(cached.director, movie.director);
    }

    #[tokio::test]
    async fn test_watchlist_add_remove_is_inverse_and_synced() {
        let synced = Arc::new(StdMutex::new(Vec::new()));
        let recorder = Arc::clone(&synced);
        let mut backend = MockSyncBackend::new();
        backend
            .expect_replace_watchlist()
            .returning(move |user_id, movies| {
                let ids: Vec<MovieId> = movies.iter().map(|m| m.id).collect();
                recorder.lock().unwrap().push((user_id.to_string(), ids));
                Ok(())
            });
        let mut provider = MockMovieProvider::new();
        quiet_enrichment(&mut provider);
        let (browser, store) = create_browser(provider, backend);
        seed_recent(&browser, &[1, 2]).await;
        browser.replace_watchlist(vec![movie(9)]).await.unwrap();
        browser.set_user(Some("42".to_string())).await;
        let before = browser.watchlist().await;

        let update = browser.add_to_watchlist(1).await.unwrap();
        assert!(update.changed);
        update.synced().await;
        assert!(browser.is_on_watchlist(1).await);

        let update = browser.remove_from_watchlist(1).await.unwrap();
        update.synced().await;
        assert_eq!(browser.watchlist().await, before);

        let ids: Vec<MovieId> = store
            .get_json(&StoreKey::WatchlistIds)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ids, vec![9]);
        assert_eq!(
            *synced.lock().unwrap(),
            vec![
                ("42".to_string(), vec![9, 1]),
                ("42".to_string(), vec![9]),
            ]
        );
    }

    #[tokio::test]
    async fn test_watchlist_without_user_stays_local() {
        let mut backend = MockSyncBackend::new();
        backend.expect_replace_watchlist().times(0);
        let (browser, _store) = create_browser(MockMovieProvider::new(), backend);
        seed_recent(&browser, &[1]).await;

        let update = browser.add_to_watchlist(1).await.unwrap();
        assert!(update.changed);
        update.synced().await;

        assert!(!browser.add_to_watchlist(1).await.unwrap().changed);
        assert!(!browser.remove_from_watchlist(2).await.unwrap().changed);
        assert!(matches!(
            browser.add_to_watchlist(77).await,
            Err(AppError::NotFound(_))
        ));
    }

    /// Records watchlist snapshots; the first upload is slow.
    #[derive(Default)]
    struct SlowFirstBackend {
        uploads: StdMutex<Vec<Vec<MovieId>>>,
    }

    #[async_trait::async_trait]
    impl SyncBackend for SlowFirstBackend {
        async fn fetch_user(&self, _user_id: &str) -> AppResult<Option<UserProfile>> {
            Ok(None)
        }

        async fn upsert_user(&self, _user: &UserProfile) -> AppResult<()> {
            Ok(())
        }

        async fn fetch_watchlist(&self, _user_id: &str) -> AppResult<Vec<Movie>> {
            Ok(Vec::new())
        }

        async fn replace_watchlist(&self, _user_id: &str, movies: Vec<Movie>) -> AppResult<()> {
            let first = self.uploads.lock().unwrap().is_empty();
            if first {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            }
            let ids = movies.iter().map(|m| m.id).collect();
            self.uploads.lock().unwrap().push(ids);
            Ok(())
        }

        async fn delete_user(&self, _user: &UserProfile) -> AppResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_watchlist_snapshots_reach_backend_in_order() {
        let backend = Arc::new(SlowFirstBackend::default());
        let browser = MovieBrowser::new(
            Arc::new(MockMovieProvider::new()),
            Arc::clone(&backend) as Arc<dyn SyncBackend>,
            Store::in_memory(),
            settings(),
        );
        browser.set_user(Some("42".to_string())).await;
        seed_recent(&browser, &[1, 2]).await;

        let first = browser.add_to_watchlist(1).await.unwrap();
        let second = browser.add_to_watchlist(2).await.unwrap();
        second.synced().await;
        first.synced().await;

        let uploads = backend.uploads.lock().unwrap().clone();
        assert_eq!(uploads, vec![vec![1], vec![1, 2]]);
    }

    #[tokio::test]
    async fn test_previous_redraws_second_recent_movie() {
        let mut provider = MockMovieProvider::new();
        provider.expect_movie_details().times(0);
        quiet_enrichment(&mut provider);
        let (browser, _store) = create_browser(provider, MockSyncBackend::new());

        assert!(matches!(browser.previous().await, Err(AppError::NotFound(_))));

        seed_recent(&browser, &[4, 5, 6]).await;
        let rendered = browser.previous().await.unwrap();
        assert_eq!(rendered.movie.id, 5);
        let ids: Vec<MovieId> = browser.recent_movies().await.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![5, 4, 6]);
    }

    #[tokio::test]
    async fn test_open_movie_from_watchlist_joins_recent() {
        let mut provider = MockMovieProvider::new();
        provider.expect_movie_details().times(0);
        quiet_enrichment(&mut provider);
        let (browser, store) = create_browser(provider, MockSyncBackend::new());
        seed_recent(&browser, &[1]).await;
        browser.replace_watchlist(vec![movie(8)]).await.unwrap();

        let rendered = browser.open_movie(8).await.unwrap();
        assert_eq!(rendered.movie.id, 8);
        assert!(rendered.on_watchlist);
        assert_recent_consistent(&browser, &store, 8).await;

        assert!(matches!(
            browser.open_movie(99).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_gimme_new_extends_pagination() {
        let mut provider = MockMovieProvider::new();
        provider
            .expect_listing_page()
            .returning(|_, index| Ok(listing(index + 1, &[index as MovieId + 1], 30)));
        provider
            .expect_movie_details()
            .returning(|id| Ok(details(id)));
        quiet_enrichment(&mut provider);
        let browser_settings = BrowseSettings {
            max_pages: 2,
            initial_pages: 1,
            ..settings()
        };
        let browser = MovieBrowser::new(
            Arc::new(provider),
            Arc::new(MockSyncBackend::new()),
            Store::in_memory(),
            browser_settings,
        );

        browser.load_candidates().await.unwrap();
        browser.finish_loading().await;
        assert_eq!(browser.pool_size().await, 2);

        browser.gimme_new().await.unwrap();
        browser.finish_loading().await;
        assert_eq!(browser.pool_size().await, 8);
    }

    #[tokio::test]
    async fn test_genres_are_fetched_once() {
        let mut provider = MockMovieProvider::new();
        provider.expect_genres().times(1).returning(|| {
            Ok(vec![
                Genre {
                    id: 28,
                    name: "Action".to_string(),
                },
                Genre {
                    id: 35,
                    name: "Comedy".to_string(),
                },
            ])
        });
        let (browser, _store) = create_browser(provider, MockSyncBackend::new());

        assert_eq!(browser.genres().await.unwrap().len(), 2);
        browser.set_genre(35, true).await.unwrap();
        browser.set_genre(28, false).await.unwrap();
        assert_eq!(
            browser.selected_genre_names().await.unwrap(),
            vec!["Comedy".to_string()]
        );
    }

    #[tokio::test]
    async fn test_release_dates_persist_and_validate() {
        let (browser, store) = create_browser(MockMovieProvider::new(), MockSyncBackend::new());
        let from = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(1999, 12, 31).unwrap();

        assert!(matches!(
            browser.set_release_dates(Some(to), Some(from)).await,
            Err(AppError::InvalidInput(_))
        ));

        browser.set_release_dates(Some(from), None).await.unwrap();
        let stored: Option<NaiveDate> = store.get_json(&StoreKey::FromDate).await.unwrap();
        assert_eq!(stored, Some(from));

        browser.clear_filters().await.unwrap();
        assert!(browser.filters().await.is_empty());
        let stored: Option<NaiveDate> = store.get_json(&StoreKey::FromDate).await.unwrap();
        assert_eq!(stored, None);
    }

    #[tokio::test]
    async fn test_load_restores_persisted_state() {
        let store = Store::in_memory();
        store.set_json(&StoreKey::RecentIds, &[2u64, 1]).await.unwrap();
        store
            .set_json(&StoreKey::RecentDetails, &[movie(2), movie(1)])
            .await
            .unwrap();
        store
            .set_json(&StoreKey::WatchlistDetails, &[movie(1)])
            .await
            .unwrap();
        store
            .set_json(&StoreKey::FromDate, &NaiveDate::from_ymd_opt(2001, 1, 1).unwrap())
            .await
            .unwrap();
        let browser = MovieBrowser::new(
            Arc::new(MockMovieProvider::new()),
            Arc::new(MockSyncBackend::new()),
            store,
            settings(),
        );

        browser.load().await.unwrap();

        assert_eq!(browser.current_movie().await.map(|m| m.id), Some(2));
        assert!(browser.is_on_watchlist(1).await);
        assert!(browser.filters().await.from_date.is_some());
    }

    #[tokio::test]
    async fn test_clear_all_data_keeps_session() {
        let (browser, store) = create_browser(MockMovieProvider::new(), MockSyncBackend::new());
        store.set_json(&StoreKey::Token, "T0K").await.unwrap();
        store.set_json(&StoreKey::Genres, &[Genre { id: 1, name: "Drama".to_string() }]).await.unwrap();
        seed_recent(&browser, &[1]).await;
        browser.persist_recent().await.unwrap();
        assert!(browser.storage_usage_mb().await.unwrap() > 0.0);

        browser.clear_all_data().await.unwrap();

        assert!(browser.recent_movies().await.is_empty());
        let token: Option<String> = store.get_json(&StoreKey::Token).await.unwrap();
        assert_eq!(token.as_deref(), Some("T0K"));
        let genres: Option<Vec<Genre>> = store.get_json(&StoreKey::Genres).await.unwrap();
        assert!(genres.is_none());
    }
}
