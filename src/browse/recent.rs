use crate::models::{Movie, MovieId};

/// Recently shown movies, most recent first
///
/// Ids and records are kept as one sequence, so the persisted id and detail
/// arrays always have equal length and matching order. When full, the least
/// recently shown movie is evicted.
#[derive(Debug, Clone, PartialEq)]
pub struct RecentMovies {
    movies: Vec<Movie>,
    capacity: usize,
}

impl RecentMovies {
    pub fn new(capacity: usize) -> Self {
        Self {
            movies: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Rebuilds the cache from persisted arrays.
    ///
    /// The detail records are authoritative; ids without a record are dropped.
    pub fn restore(ids: &[MovieId], movies: Vec<Movie>, capacity: usize) -> Self {
        let mut recent = Self::new(capacity);
        if ids.len() != movies.len() || ids.iter().zip(&movies).any(|(id, m)| *id != m.id) {
            tracing::warn!(
                ids = ids.len(),
                details = movies.len(),
                "Recent movie arrays disagree; rebuilding ids from details"
            );
        }
        for movie in movies {
            if !recent.contains(movie.id) && recent.movies.len() < recent.capacity {
                recent.movies.push(movie);
            }
        }
        recent
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    pub fn position(&self, id: MovieId) -> Option<usize> {
        self.movies.iter().position(|movie| movie.id == id)
    }

    pub fn contains(&self, id: MovieId) -> bool {
        self.position(id).is_some()
    }

    pub fn get(&self, id: MovieId) -> Option<&Movie> {
        self.movies.iter().find(|movie| movie.id == id)
    }

    pub fn get_index(&self, index: usize) -> Option<&Movie> {
        self.movies.get(index)
    }

    pub fn ids(&self) -> Vec<MovieId> {
        self.movies.iter().map(|movie| movie.id).collect()
    }

    pub fn movies(&self) -> &[Movie] {
        &self.movies
    }

    /// Moves a cached movie to the front.
    pub fn promote(&mut self, id: MovieId) -> Option<&Movie> {
        let index = self.position(id)?;
        let movie = self.movies.remove(index);
        self.movies.insert(0, movie);
        self.movies.first()
    }

    /// Inserts a movie at the front, replacing any older copy.
    pub fn push_front(&mut self, movie: Movie) {
        if let Some(index) = self.position(movie.id) {
            self.movies.remove(index);
        }
        self.movies.insert(0, movie);
        if self.movies.len() > self.capacity {
            if let Some(evicted) = self.movies.pop() {
                tracing::debug!(movie_id = evicted.id, "Evicted movie from the recent cache");
            }
        }
    }

    /// Applies `update` to the cached copy of a movie, if any.
    pub fn update(&mut self, id: MovieId, update: impl FnOnce(&mut Movie)) -> bool {
        match self.movies.iter_mut().find(|movie| movie.id == id) {
            Some(movie) => {
                update(movie);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.movies.clear();
    }
}
