use crate::models::{Movie, MovieId};

/// Movies the user saved, in the order they were added
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Watchlist {
    movies: Vec<Movie>,
}

impl Watchlist {
    pub fn new(movies: Vec<Movie>) -> Self {
        let mut watchlist = Self::default();
        for movie in movies {
            watchlist.add(movie);
        }
        watchlist
    }

    /// Appends a movie. Returns `false` if it was already saved.
    pub fn add(&mut self, movie: Movie) -> bool {
        if self.contains(movie.id) {
            return false;
        }
        self.movies.push(movie);
        true
    }

    /// Removes a movie. Returns `false` if it was not saved.
    pub fn remove(&mut self, id: MovieId) -> bool {
        let before = self.movies.len();
        self.movies.retain(|movie| movie.id != id);
        self.movies.len() != before
    }

    pub fn contains(&self, id: MovieId) -> bool {
        self.movies.iter().any(|movie| movie.id == id)
    }

    pub fn get(&self, id: MovieId) -> Option<&Movie> {
        self.movies.iter().find(|movie| movie.id == id)
    }

    pub fn ids(&self) -> Vec<MovieId> {
        self.movies.iter().map(|movie| movie.id).collect()
    }

    pub fn movies(&self) -> &[Movie] {
        &self.movies
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }
}
