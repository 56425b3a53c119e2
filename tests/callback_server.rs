use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::json;

use watto::api::{create_router, AppState};
use watto::auth::{AuthSettings, FacebookAuth, OpenedView, ViewHandle, ViewLauncher};
use watto::error::AppResult;
use watto::store::{Store, StoreKey};

struct NoopHandle;

impl ViewHandle for NoopHandle {
    fn close(&self) {}
}

struct NoopLauncher;

#[async_trait::async_trait]
impl ViewLauncher for NoopLauncher {
    async fn open(&self, _url: &str) -> AppResult<OpenedView> {
        Ok(OpenedView {
            handle: Arc::new(NoopHandle),
            events: None,
        })
    }

    fn is_embedded(&self) -> bool {
        false
    }
}

async fn create_test_server() -> (TestServer, Arc<FacebookAuth>, Store) {
    let store = Store::in_memory();
    let auth = Arc::new(FacebookAuth::new(
        AuthSettings {
            login_url: "https://www.facebook.com/dialog/oauth".to_string(),
            logout_url: "https://www.facebook.com/logout.php".to_string(),
            embedded_redirect_url: "https://www.facebook.com/connect/login_success.html"
                .to_string(),
            graph_api_url: "https://graph.facebook.com".to_string(),
            callback_base_url: "http://127.0.0.1:3000".to_string(),
        },
        store.clone(),
        Arc::new(NoopLauncher),
    ));
    auth.initialize(Some("734151323370803"), None).await.unwrap();

    let app = create_router(AppState::new(Arc::clone(&auth)));
    (TestServer::new(app).unwrap(), auth, store)
}

#[tokio::test]
async fn test_health_check() {
    let (server, _auth, _store) = create_test_server().await;
    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_json(&json!({ "status": "healthy" }));
}

#[tokio::test]
async fn test_callback_page_posts_location_back() {
    let (server, _auth, _store) = create_test_server().await;
    let response = server.get("/oauthcallback.html").await;
    response.assert_status_ok();
    let page = response.text();
    assert!(page.contains("fetch(\"/oauthcallback\""));
    assert!(page.contains("window.location.href"));

    let response = server.get("/logoutcallback.html").await;
    response.assert_status_ok();
    assert!(response.text().contains("logged out"));
}

#[tokio::test]
async fn test_redirect_without_pending_login_conflicts() {
    let (server, _auth, store) = create_test_server().await;

    let response = server
        .post("/oauthcallback")
        .json(&json!({ "url": "http://127.0.0.1:3000/oauthcallback.html#access_token=X" }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let token: Option<String> = store.get_json(&StoreKey::Token).await.unwrap();
    assert_eq!(token, None);
}

#[tokio::test]
async fn test_token_redirect_completes_login_once() {
    let (server, auth, store) = create_test_server().await;
    let attempt = auth.login("email").await.unwrap();
    let body = json!({ "url": "http://127.0.0.1:3000/oauthcallback.html#access_token=X&expires_in=5183999" });

    let response = server.post("/oauthcallback").json(&body).await;
    response.assert_status_ok();
    response.assert_json(&json!({ "status": "connected", "token": "X" }));

    let response = server.post("/oauthcallback").json(&body).await;
    response.assert_status(StatusCode::CONFLICT);

    let status = attempt.outcome().await.unwrap();
    assert!(status.is_connected());
    let token: Option<String> = store.get_json(&StoreKey::Token).await.unwrap();
    assert_eq!(token.as_deref(), Some("X"));
}

#[tokio::test]
async fn test_error_redirect_is_not_authorized() {
    let (server, auth, store) = create_test_server().await;
    let attempt = auth.login("email").await.unwrap();

    let response = server
        .post("/oauthcallback")
        .json(&json!({
            "url": "http://127.0.0.1:3000/oauthcallback.html?error=access_denied&error_reason=user_denied#_=_"
        }))
        .await;

    response.assert_status_ok();
    response.assert_json(&json!({ "status": "not_authorized", "error": "access_denied" }));
    assert!(!attempt.outcome().await.unwrap().is_connected());
    let token: Option<String> = store.get_json(&StoreKey::Token).await.unwrap();
    assert_eq!(token, None);
}

#[tokio::test]
async fn test_request_id_is_echoed_or_generated() {
    let (server, _auth, _store) = create_test_server().await;
    let request_id = HeaderName::from_static("x-request-id");

    let response = server
        .get("/health")
        .add_header(
            request_id.clone(),
            HeaderValue::from_static("callback-page-1"),
        )
        .await;
    assert_eq!(response.header(request_id.clone()), "callback-page-1");

    let response = server.get("/health").await;
    let generated = response.header(request_id);
    assert!(uuid::Uuid::parse_str(generated.to_str().unwrap()).is_ok());
}
