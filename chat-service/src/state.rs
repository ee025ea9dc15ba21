//! Application state for chat service.

use std::sync::Arc;

use common::config::AppConfig;

use crate::llm::CompletionModel;
use crate::session::SessionStore;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub sessions: Arc<SessionStore>,
    pub llm: Arc<dyn CompletionModel>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(config: AppConfig, llm: Arc<dyn CompletionModel>) -> Self {
        Self {
            config,
            sessions: Arc::new(SessionStore::new()),
            llm,
        }
    }
}
