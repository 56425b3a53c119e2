use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use watto::models::MovieId;

#[derive(Parser)]
#[command(name = "watto")]
#[command(version = "0.1")]
#[command(about = "Random movie recommendations with a Facebook-synced watchlist")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Logs in with Facebook through the system browser
    Login,
    /// Logs out and forgets the cached user
    Logout,
    /// Revokes the app's Facebook permissions
    Revoke,
    /// Revokes permissions and deletes the backend account
    DeleteAccount,
    /// Shows the login status and cached user
    Status,
    /// Resolves the signed-in user and downloads the watchlist
    Sync,
    /// Draws a random movie matching the filters
    Recommend {
        /// Load six more listing pages before drawing
        #[arg(long)]
        more: bool,
    },
    /// Shows the previously drawn movie again
    Previous,
    /// Shows a movie from the recent movies or the watchlist
    Open {
        #[arg(value_name = "MOVIE_ID")]
        id: MovieId,
    },
    /// Lists recently shown movies
    Recent,
    /// Manage the watchlist
    Watchlist {
        #[command(subcommand)]
        command: WatchlistCommands,
    },
    /// Manage listing filters
    Filters {
        #[command(subcommand)]
        command: FilterCommands,
    },
    /// Lists the genre catalogue
    Genres,
    /// Clears all local data except the session
    Clear,
    /// Shows how much local storage is used
    Storage,
    /// Runs the OAuth callback server until interrupted
    Serve,
}

#[derive(Subcommand)]
pub enum WatchlistCommands {
    /// Adds a movie (the current one if no id is given)
    Add {
        #[arg(value_name = "MOVIE_ID")]
        id: Option<MovieId>,
    },
    /// Removes a movie
    Remove {
        #[arg(value_name = "MOVIE_ID")]
        id: MovieId,
    },
    /// Lists saved movies
    List,
}

#[derive(Subcommand)]
pub enum FilterCommands {
    /// Shows the active filters
    Show,
    /// Selects or deselects a genre
    Genre {
        #[arg(value_name = "GENRE_ID")]
        id: u32,
        /// Deselect instead of select
        #[arg(long)]
        off: bool,
    },
    /// Sets the release date range (YYYY-MM-DD)
    Dates {
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Deselects every genre
    ResetGenres,
    /// Removes all filters
    Clear,
}
