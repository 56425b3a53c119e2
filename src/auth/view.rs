//! External views the login and logout pages are opened in.
//!
//! A plain browser only opens the page; completion arrives later through the
//! callback server. An embedded view additionally reports navigation events so
//! the login can be completed by watching URLs.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::{AppError, AppResult};

/// Navigation events reported by an embedded view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    /// A page started loading
    LoadStart(String),
    /// The view was closed, by the user or programmatically
    Exit,
}

/// Handle used to close an opened view
pub trait ViewHandle: Send + Sync {
    fn close(&self);
}

/// A view that has been opened
pub struct OpenedView {
    pub handle: Arc<dyn ViewHandle>,
    /// Navigation events, present only for embedded views
    pub events: Option<mpsc::UnboundedReceiver<ViewEvent>>,
}

impl std::fmt::Debug for OpenedView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedView")
            .field("embedded", &self.events.is_some())
            .finish()
    }
}

/// Opens provider pages
#[async_trait::async_trait]
pub trait ViewLauncher: Send + Sync {
    async fn open(&self, url: &str) -> AppResult<OpenedView>;

    /// Whether opened views report navigation events
    fn is_embedded(&self) -> bool;
}

struct DetachedHandle;

impl ViewHandle for DetachedHandle {
    fn close(&self) {
        tracing::debug!("System browser tabs cannot be closed from here");
    }
}

/// Opens pages in the user's default browser
#[derive(Debug, Default, Clone)]
pub struct SystemBrowser;

#[async_trait::async_trait]
impl ViewLauncher for SystemBrowser {
    async fn open(&self, url: &str) -> AppResult<OpenedView> {
        tracing::info!(url = %url, "Opening page in the system browser");
        open::that(url)
            .map_err(|e| AppError::Internal(format!("Failed to open browser: {}", e)))?;

        Ok(OpenedView {
            handle: Arc::new(DetachedHandle),
            events: None,
        })
    }

    fn is_embedded(&self) -> bool {
        false
    }
}
