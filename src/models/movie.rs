use serde::{Deserialize, Serialize};

use super::tmdb::MovieDetails;

/// themoviedb.org movie identifier
pub type MovieId = u64;

const FULL_POSTER_SIZE: &str = "w396";
const THUMB_POSTER_SIZE: &str = "w185";
const SMALL_POSTER_SIZE: &str = "w75";
const EMPTY_POSTER: &str = "images/empty.png";
const EMPTY_POSTER_THUMB: &str = "images/empty_tn.png";

/// A genre as reported by the listing API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Genre {
    pub id: u32,
    pub name: String,
}

/// A production country as reported by the listing API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Country {
    pub iso_3166_1: String,
    pub name: String,
}

/// Poster image URLs at the three sizes the app displays
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PosterUrls {
    #[serde(rename = "poster")]
    pub full: String,
    #[serde(rename = "posterTn")]
    pub thumb: String,
    #[serde(rename = "posterSn")]
    pub small: String,
}

impl PosterUrls {
    /// Builds CDN URLs for a poster path, falling back to bundled placeholders.
    pub fn from_path(image_base: &str, poster_path: Option<&str>) -> Self {
        match poster_path {
            Some(path) => {
                let base = image_base.trim_end_matches('/');
                Self {
                    full: format!("{}/{}{}", base, FULL_POSTER_SIZE, path),
                    thumb: format!("{}/{}{}", base, THUMB_POSTER_SIZE, path),
                    small: format!("{}/{}{}", base, SMALL_POSTER_SIZE, path),
                }
            }
            None => Self {
                full: EMPTY_POSTER.to_string(),
                thumb: EMPTY_POSTER_THUMB.to_string(),
                small: EMPTY_POSTER_THUMB.to_string(),
            },
        }
    }
}

/// Normalized movie record shown to the user and persisted in the recency cache
/// and the watchlist.
///
/// The serialized field names match the records the backend already stores for
/// existing watchlists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    /// Four-digit release year, empty when the provider has no release date
    #[serde(rename = "released", default)]
    pub release_year: String,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub countries: Vec<Country>,
    #[serde(rename = "otitle", default)]
    pub original_title: String,
    #[serde(rename = "votes", default)]
    pub vote_count: u32,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(flatten)]
    pub posters: PosterUrls,
    /// Cast names, filled in after the credits lookup completes
    #[serde(default)]
    pub actors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,
    /// YouTube video key of the first trailer, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trailer: Option<String>,
}

impl Movie {
    /// Normalizes provider details into the record the app keeps.
    pub fn from_details(details: MovieDetails, image_base: &str) -> Self {
        let release_year = details
            .release_date
            .as_deref()
            .map(|date| date.chars().take(4).collect())
            .unwrap_or_default();
        let posters = PosterUrls::from_path(image_base, details.poster_path.as_deref());

        Self {
            id: details.id,
            title: details.title,
            release_year,
            genres: details.genres,
            overview: details.overview.unwrap_or_default(),
            countries: details.production_countries,
            original_title: details.original_title.unwrap_or_default(),
            vote_count: details.vote_count,
            vote_average: details.vote_average,
            posters,
            actors: Vec::new(),
            director: None,
            trailer: None,
        }
    }

    /// Star rating on a 0-5 scale derived from the 0-10 vote average.
    pub fn rating(&self) -> f64 {
        (self.vote_average * 10.0).trunc() / 20.0
    }
}
