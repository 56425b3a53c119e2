use serde::Deserialize;

/// Which key-value backend holds the persisted session, caches and filters
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    File,
    Redis,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Facebook application id used for the OAuth dialog
    #[serde(default)]
    pub facebook_app_id: Option<String>,

    /// Facebook OAuth dialog URL
    #[serde(default = "default_facebook_login_url")]
    pub facebook_login_url: String,

    /// Facebook logout page URL
    #[serde(default = "default_facebook_logout_url")]
    pub facebook_logout_url: String,

    /// Redirect target used when the login runs inside an embedded view
    #[serde(default = "default_embedded_redirect_url")]
    pub facebook_embedded_redirect_url: String,

    /// Graph API base URL
    #[serde(default = "default_graph_api_url")]
    pub graph_api_url: String,

    /// Permissions requested on login
    #[serde(default = "default_login_scope")]
    pub login_scope: String,

    /// Run the login inside an embedded view that reports navigation events
    #[serde(default)]
    pub embedded_view: bool,

    /// themoviedb.org API key
    pub tmdb_api_key: String,

    /// themoviedb.org API base URL
    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,

    /// themoviedb.org image CDN base URL
    #[serde(default = "default_tmdb_image_url")]
    pub tmdb_image_url: String,

    /// Backend sync store base URL
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Key-value store backend
    #[serde(default = "default_store_backend")]
    pub store_backend: StoreBackend,

    /// Path of the JSON file used by the file store backend
    #[serde(default = "default_store_path")]
    pub store_path: String,

    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Callback server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Callback server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Listing pages loaded into the candidate pool per filter set
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Page index after which the first recommendation is drawn
    #[serde(default = "default_initial_pages")]
    pub initial_pages: u32,

    /// Maximum number of movies kept in the recency cache
    #[serde(default = "default_recent_capacity")]
    pub recent_capacity: usize,
}

fn default_facebook_login_url() -> String {
    "https://www.facebook.com/dialog/oauth".to_string()
}

fn default_facebook_logout_url() -> String {
    "https://www.facebook.com/logout.php".to_string()
}

fn default_embedded_redirect_url() -> String {
    "https://www.facebook.com/connect/login_success.html".to_string()
}

fn default_graph_api_url() -> String {
    "https://graph.facebook.com".to_string()
}

fn default_login_scope() -> String {
    "email".to_string()
}

fn default_tmdb_api_url() -> String {
    "http://api.themoviedb.org/3".to_string()
}

fn default_tmdb_image_url() -> String {
    "https://image.tmdb.org/t/p".to_string()
}

fn default_backend_url() -> String {
    "http://wapi-qno.rhcloud.com/ws".to_string()
}

fn default_store_backend() -> StoreBackend {
    StoreBackend::File
}

fn default_store_path() -> String {
    "watto-store.json".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_max_pages() -> u32 {
    12
}

fn default_initial_pages() -> u32 {
    6
}

fn default_recent_capacity() -> usize {
    200
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Base URL the local callback server answers on
    pub fn callback_base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let vars = vec![("TMDB_API_KEY".to_string(), "key".to_string())];
        let config: Config = envy::from_iter(vars).unwrap();

        assert_eq!(config.tmdb_api_key, "key");
        assert_eq!(config.facebook_app_id, None);
        assert_eq!(config.max_pages, 12);
        assert_eq!(config.initial_pages, 6);
        assert_eq!(config.store_backend, StoreBackend::File);
        assert!(!config.embedded_view);
        assert_eq!(config.callback_base_url(), "http://127.0.0.1:3000");
    }

    #[test]
    fn test_overrides() {
        let vars = vec![
            ("TMDB_API_KEY".to_string(), "key".to_string()),
            ("FACEBOOK_APP_ID".to_string(), "734151323370803".to_string()),
            ("STORE_BACKEND".to_string(), "redis".to_string()),
            ("EMBEDDED_VIEW".to_string(), "true".to_string()),
            ("PORT".to_string(), "8080".to_string()),
        ];
        let config: Config = envy::from_iter(vars).unwrap();

        assert_eq!(config.facebook_app_id.as_deref(), Some("734151323370803"));
        assert_eq!(config.store_backend, StoreBackend::Redis);
        assert!(config.embedded_view);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_missing_api_key_fails() {
        let vars: Vec<(String, String)> = Vec::new();
        assert!(envy::from_iter::<_, Config>(vars).is_err());
    }
}
