// ============================================================================
// themoviedb.org API Types
// ============================================================================

use serde::Deserialize;

use super::{Country, Genre, MovieId};

const RELEASED_STATUS: &str = "released";
const YOUTUBE_SITE: &str = "YouTube";
const DIRECTOR_JOB: &str = "Director";

/// One page of a listing endpoint (`discover/movie`, `movie/popular`)
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ListingPage {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub results: Vec<ListingResult>,
    #[serde(default)]
    pub total_pages: u32,
}

impl ListingPage {
    pub fn ids(&self) -> impl Iterator<Item = MovieId> + '_ {
        self.results.iter().map(|r| r.id)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ListingResult {
    pub id: MovieId,
}

/// Raw movie details from `movie/{id}`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MovieDetails {
    pub id: MovieId,
    pub title: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub production_countries: Vec<Country>,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub vote_count: u32,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub adult: bool,
    #[serde(default)]
    pub status: Option<String>,
}

impl MovieDetails {
    /// Rejects adult titles and titles that have not been released yet.
    pub fn validate(&self) -> Result<(), String> {
        if self.adult {
            return Err("adult content".to_string());
        }
        match self.status.as_deref() {
            Some(status) if status.eq_ignore_ascii_case(RELEASED_STATUS) => Ok(()),
            Some(status) => Err(format!("release status is {}", status)),
            None => Err("release status missing".to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct VideoList {
    #[serde(default)]
    pub results: Vec<Video>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Video {
    pub key: String,
    pub site: String,
}

impl VideoList {
    /// Key of the first video when it is hosted on YouTube.
    pub fn trailer_key(&self) -> Option<String> {
        self.results
            .first()
            .filter(|video| video.site == YOUTUBE_SITE)
            .map(|video| video.key.clone())
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastMember>,
    #[serde(default)]
    pub crew: Vec<CrewMember>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CastMember {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CrewMember {
    pub name: String,
    #[serde(default)]
    pub job: String,
}

impl Credits {
    /// The last crew member credited as director.
    pub fn director(&self) -> Option<String> {
        self.crew
            .iter()
            .rev()
            .find(|member| member.job == DIRECTOR_JOB)
            .map(|member| member.name.clone())
    }

    pub fn actors(&self) -> Vec<String> {
        self.cast.iter().map(|member| member.name.clone()).collect()
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GenreList {
    #[serde(default)]
    pub genres: Vec<Genre>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_page_deserialization() {
        let json = r#"{
            "page": 1,
            "results": [{"id": 10, "title": "A"}, {"id": 20, "title": "B"}],
            "total_pages": 42,
            "total_results": 830
        }"#;

        let page: ListingPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.total_pages, 42);
        assert_eq!(page.ids().collect::<Vec<_>>(), vec![10, 20]);
    }

    #[test]
    fn test_validate_rejects_adult_and_unreleased() {
        let json = r#"{"id": 1, "title": "X", "adult": true, "status": "Released"}"#;
        let adult: MovieDetails = serde_json::from_str(json).unwrap();
        assert!(adult.validate().is_err());

        let json = r#"{"id": 2, "title": "Y", "adult": false, "status": "Post Production"}"#;
        let unreleased: MovieDetails = serde_json::from_str(json).unwrap();
        assert_eq!(
            unreleased.validate(),
            Err("release status is Post Production".to_string())
        );

        let json = r#"{"id": 3, "title": "Z", "status": "released"}"#;
        let released: MovieDetails = serde_json::from_str(json).unwrap();
        assert!(released.validate().is_ok());
    }

    #[test]
    fn test_trailer_key_only_for_youtube() {
        let videos: VideoList = serde_json::from_str(
            r#"{"results": [{"key": "vKQi3bBA1y8", "site": "YouTube"}]}"#,
        )
        .unwrap();
        assert_eq!(videos.trailer_key(), Some("vKQi3bBA1y8".to_string()));

        let videos: VideoList =
            serde_json::from_str(r#"{"results": [{"key": "123", "site": "Vimeo"}]}"#).unwrap();
        assert_eq!(videos.trailer_key(), None);

        let videos: VideoList = serde_json::from_str(r#"{"results": []}"#).unwrap();
        assert_eq!(videos.trailer_key(), None);
    }

    #[test]
    fn test_credits_director_and_actors() {
        let credits: Credits = serde_json::from_str(
            r#"{
                "cast": [{"name": "Keanu Reeves"}, {"name": "Carrie-Anne Moss"}],
                "crew": [
                    {"name": "Lana Wachowski", "job": "Director"},
                    {"name": "Bill Pope", "job": "Director of Photography"},
                    {"name": "Lilly Wachowski", "job": "Director"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(credits.director(), Some("Lilly Wachowski".to_string()));
        assert_eq!(credits.actors(), vec!["Keanu Reeves", "Carrie-Anne Moss"]);
    }
}
