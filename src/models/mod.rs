pub mod filters;
pub mod movie;
pub mod tmdb;
pub mod user;

pub use filters::{build_query, build_query_at, Filters, ListingEndpoint, ListingQuery};
pub use movie::{Country, Genre, Movie, MovieId, PosterUrls};
pub use tmdb::{CastMember, Credits, CrewMember, GenreList, ListingPage, MovieDetails, VideoList};
pub use user::{UserProfile, WatchlistRecord};
