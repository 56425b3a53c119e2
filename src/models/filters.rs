use std::collections::BTreeMap;
use std::fmt::Display;

use chrono::{Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// User-chosen listing filters
///
/// Genre selection keeps every toggled genre, including ones switched back off,
/// so the filter screen can restore its checkboxes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    pub genres: BTreeMap<u32, bool>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

impl Filters {
    /// Genre ids switched on, ascending
    pub fn selected_genres(&self) -> Vec<u32> {
        self.genres
            .iter()
            .filter(|(_, selected)| **selected)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.selected_genres().is_empty() && self.from_date.is_none() && self.to_date.is_none()
    }
}

/// Listing endpoint a query runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingEndpoint {
    /// Unfiltered popular movies
    Popular,
    /// Filtered discovery
    Discover,
}

impl ListingEndpoint {
    pub fn path(&self) -> &'static str {
        match self {
            ListingEndpoint::Popular => "movie/popular",
            ListingEndpoint::Discover => "discover/movie",
        }
    }
}

/// A rendered listing query: endpoint plus filter parameters, without the API
/// key or page number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    pub endpoint: ListingEndpoint,
    pub params: Vec<(String, String)>,
}

impl Display for ListingQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.endpoint.path())?;
        for (i, (key, value)) in self.params.iter().enumerate() {
            let separator = if i == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", separator, key, value)?;
        }
        Ok(())
    }
}

/// Renders filters into a listing query relative to today's date.
pub fn build_query(filters: &Filters) -> ListingQuery {
    build_query_at(filters, Utc::now().date_naive())
}

/// Renders filters into a listing query.
///
/// Genres become an OR-joined id list. Dates become inclusive bounds on the
/// primary release date, with the upper bound defaulting to the day after
/// `today` when only a lower bound is set.
pub fn build_query_at(filters: &Filters, today: NaiveDate) -> ListingQuery {
    let mut params = Vec::new();

    let genres = filters.selected_genres();
    if !genres.is_empty() {
        let joined = genres
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join("|");
        params.push(("with_genres".to_string(), joined));
    }

    if let Some(from) = filters.from_date {
        params.push(("primary_release_date.gte".to_string(), from.to_string()));
    }

    let upper = match (filters.from_date, filters.to_date) {
        (_, Some(to)) => Some(to),
        (Some(_), None) => today.checked_add_days(Days::new(1)),
        (None, None) => None,
    };
    if let Some(to) = upper {
        params.push(("primary_release_date.lte".to_string(), to.to_string()));
    }

    let endpoint = if params.is_empty() {
        ListingEndpoint::Popular
    } else {
        ListingEndpoint::Discover
    };

    ListingQuery { endpoint, params }
}
