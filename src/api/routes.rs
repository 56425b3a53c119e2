use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};

/// Creates the callback router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/oauthcallback.html", get(handlers::oauth_callback_page))
        .route("/oauthcallback", post(handlers::oauth_callback))
        .route("/logoutcallback.html", get(handlers::logout_callback_page))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id)),
        )
}

/// Serves the callback router until the task is aborted or the listener fails.
pub async fn serve(listener: TcpListener, state: AppState) -> AppResult<()> {
    let addr = listener
        .local_addr()
        .map_err(|e| AppError::Internal(format!("Callback listener has no address: {}", e)))?;
    tracing::info!(addr = %addr, "Callback server listening");

    axum::serve(listener, create_router(state))
        .await
        .map_err(|e| AppError::Internal(format!("Callback server failed: {}", e)))
}
