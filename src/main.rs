mod cli;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Commands, FilterCommands, WatchlistCommands};
use watto::{
    api::{self, AppState},
    auth::{AuthSettings, FacebookAuth, SystemBrowser},
    browse::{BrowseSettings, MovieBrowser, RenderedMovie},
    config::{Config, StoreBackend},
    error::AppResult,
    models::Movie,
    providers::{HttpBackend, MovieProvider, SyncBackend, TmdbProvider},
    session::Session,
    store::{create_redis_client, FileStore, KeyValueStore, MemoryStore, RedisStore, Store},
};

struct App {
    config: Config,
    auth: Arc<FacebookAuth>,
    browser: MovieBrowser,
    session: Session,
}

impl App {
    async fn build(config: Config) -> anyhow::Result<Self> {
        let store = open_store(&config)?;

        if config.embedded_view {
            tracing::warn!("Embedded login views are not available from the command line, using the system browser");
        }
        let auth = Arc::new(FacebookAuth::new(
            AuthSettings::from_config(&config),
            store.clone(),
            Arc::new(SystemBrowser),
        ));
        if let Err(e) = auth.initialize(config.facebook_app_id.as_deref(), None).await {
            tracing::warn!(error = %e, "Facebook login is disabled");
        }

        let provider = Arc::new(TmdbProvider::new(
            config.tmdb_api_key.clone(),
            config.tmdb_api_url.clone(),
        ));
        tracing::debug!(provider = provider.name(), "Movie provider ready");
        let backend: Arc<dyn SyncBackend> = Arc::new(HttpBackend::new(config.backend_url.clone()));
        let browser = MovieBrowser::new(
            provider,
            Arc::clone(&backend),
            store.clone(),
            BrowseSettings::from_config(&config),
        );
        browser.load().await.context("Failed to restore browsing state")?;

        let session = Session::new(
            Arc::clone(&auth),
            browser.clone(),
            backend,
            store,
            config.login_scope.clone(),
        );

        Ok(Self {
            config,
            auth,
            browser,
            session,
        })
    }

    async fn spawn_callback_server(&self) -> anyhow::Result<JoinHandle<AppResult<()>>> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind callback server on {}", addr))?;
        let state = AppState::new(Arc::clone(&self.auth));
        Ok(tokio::spawn(api::serve(listener, state)))
    }
}

fn open_store(config: &Config) -> anyhow::Result<Store> {
    let backend: Arc<dyn KeyValueStore> = match config.store_backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::File => Arc::new(FileStore::open(&config.store_path)?),
        StoreBackend::Redis => Arc::new(RedisStore::new(create_redis_client(&config.redis_url)?)),
    };
    tracing::debug!(backend = ?config.store_backend, "Store opened");
    Ok(Store::new(backend))
}

fn print_movie(movie: &Movie, on_watchlist: bool) {
    println!("{} ({}) [{}]", movie.title, movie.release_year, movie.id);
    if movie.original_title != movie.title {
        println!("  original title: {}", movie.original_title);
    }
    println!("  rating: {:.1}/5 from {} votes", movie.rating(), movie.vote_count);
    if !movie.genres.is_empty() {
        let genres: Vec<&str> = movie.genres.iter().map(|g| g.name.as_str()).collect();
        println!("  genres: {}", genres.join(", "));
    }
    if let Some(director) = &movie.director {
        println!("  director: {}", director);
    }
    if !movie.actors.is_empty() {
        let actors: Vec<&str> = movie.actors.iter().take(5).map(String::as_str).collect();
        println!("  cast: {}", actors.join(", "));
    }
    if let Some(trailer) = &movie.trailer {
        println!("  trailer: https://www.youtube.com/watch?v={}", trailer);
    }
    println!("  poster: {}", movie.posters.full);
    if on_watchlist {
        println!("  on your watchlist");
    }
    if !movie.overview.is_empty() {
        println!();
        println!("{}", movie.overview);
    }
}

async fn show(rendered: RenderedMovie) {
    let on_watchlist = rendered.on_watchlist;
    let movie = rendered.enriched().await;
    print_movie(&movie, on_watchlist);
}

fn print_list(movies: &[Movie]) {
    if movies.is_empty() {
        println!("(empty)");
    }
    for movie in movies {
        println!("{:>8}  {} ({})", movie.id, movie.title, movie.release_year);
    }
}

async fn run(app: &App, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Login => {
            let server = app.spawn_callback_server().await?;
            let status = app.session.login().await;
            server.abort();
            println!("{}", serde_json::to_string_pretty(&status?)?);
        }
        Commands::Logout => {
            app.session.logout().await?;
            println!("Logged out");
        }
        Commands::Revoke => {
            app.auth.revoke_permissions().await?;
            println!("Permissions revoked");
        }
        Commands::DeleteAccount => {
            app.session.delete_account().await?;
            println!("Account deleted");
        }
        Commands::Status => {
            let status = app.auth.get_login_status().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            if let Some(user) = app.session.cached_user().await? {
                println!("user: {} ({})", user.name, user.id);
            }
        }
        Commands::Sync => match app.session.bootstrap().await? {
            Some(user) => println!("Signed in as {} ({})", user.name, user.id),
            None => println!("No backend record for the cached user"),
        },
        Commands::Recommend { more } => {
            let mut rendered = app.browser.load_candidates().await?;
            if more {
                rendered = app.browser.gimme_new().await?;
            }
            app.browser.stop_loading().await;
            show(rendered).await;
        }
        Commands::Previous => show(app.browser.previous().await?).await,
        Commands::Open { id } => show(app.browser.open_movie(id).await?).await,
        Commands::Recent => print_list(&app.browser.recent_movies().await),
        Commands::Watchlist { command } => match command {
            WatchlistCommands::Add { id } => {
                let id = match id {
                    Some(id) => id,
                    None => {
                        app.browser
                            .current_movie()
                            .await
                            .context("No movie has been shown yet")?
                            .id
                    }
                };
                let update = app.browser.add_to_watchlist(id).await?;
                let changed = update.changed;
                update.synced().await;
                println!("{}", if changed { "Added" } else { "Already on the watchlist" });
            }
            WatchlistCommands::Remove { id } => {
                let update = app.browser.remove_from_watchlist(id).await?;
                let changed = update.changed;
                update.synced().await;
                println!("{}", if changed { "Removed" } else { "Not on the watchlist" });
            }
            WatchlistCommands::List => print_list(&app.browser.watchlist().await),
        },
        Commands::Filters { command } => match command {
            FilterCommands::Show => {
                let filters = app.browser.filters().await;
                let genres = app.browser.selected_genre_names().await?;
                println!("genres: {}", if genres.is_empty() { "any".to_string() } else { genres.join(", ") });
                println!("from: {}", filters.from_date.map_or("-".to_string(), |d| d.to_string()));
                println!("to: {}", filters.to_date.map_or("-".to_string(), |d| d.to_string()));
                println!("query: {}", app.browser.query().await);
            }
            FilterCommands::Genre { id, off } => app.browser.set_genre(id, !off).await?,
            FilterCommands::Dates { from, to } => app.browser.set_release_dates(from, to).await?,
            FilterCommands::ResetGenres => app.browser.reset_genres().await?,
            FilterCommands::Clear => app.browser.clear_filters().await?,
        },
        Commands::Genres => {
            for genre in app.browser.genres().await? {
                println!("{:>6}  {}", genre.id, genre.name);
            }
        }
        Commands::Clear => {
            app.browser.clear_all_data().await?;
            println!("Local data cleared");
        }
        Commands::Storage => {
            println!("{:.2} MB", app.browser.storage_usage_mb().await?);
        }
        Commands::Serve => {
            let server = app.spawn_callback_server().await?;
            println!("Callback server running on {}", app.config.callback_base_url());
            tokio::signal::ctrl_c().await?;
            server.abort();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "watto=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let app = App::build(config).await?;

    run(&app, cli.command).await
}
