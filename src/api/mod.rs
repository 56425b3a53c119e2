//! Local HTTP server that receives OAuth redirects from the system browser.

mod handlers;
mod routes;
mod state;

pub use routes::{create_router, serve};
pub use state::AppState;
