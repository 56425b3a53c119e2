use std::sync::Arc;

use crate::auth::FacebookAuth;

/// State shared by the callback handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<FacebookAuth>,
}

impl AppState {
    pub fn new(auth: Arc<FacebookAuth>) -> Self {
        Self { auth }
    }
}
