pub mod api;
pub mod auth;
pub mod browse;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod providers;
pub mod session;
pub mod store;
