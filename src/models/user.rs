use serde::{Deserialize, Serialize};

/// Facebook profile of the signed-in user, as returned by `/me`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A user's watchlist as the backend stores it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchlistRecord {
    pub uid: String,
    #[serde(default)]
    pub results: Vec<super::Movie>,
}
