// Application state module
// Shared, explicitly constructed collaborators handed to every connection

use std::sync::Arc;

use super::types::Config;
use crate::logger::ChangeLog;
use crate::store::ArticleStore;

/// Application state
pub struct AppState {
    pub config: Config,
    pub store: ArticleStore,
    pub change_log: Arc<dyn ChangeLog>,
}

impl AppState {
    pub fn new(config: Config, store: ArticleStore, change_log: Arc<dyn ChangeLog>) -> Self {
        Self {
            config,
            store,
            change_log,
        }
    }

    /// Build state from configuration: the store lives at `storage.articles_path`
    pub fn from_config(config: Config, change_log: Arc<dyn ChangeLog>) -> Self {
        let store = ArticleStore::new(&config.storage.articles_path);
        Self::new(config, store, change_log)
    }
}
