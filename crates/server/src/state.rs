use tokio::sync::watch;
use trmote_core::{Config, SanitizedConfig, SyncHandle, ViewSnapshot};

/// Shared application state
pub struct AppState {
    config: Config,
    sync: SyncHandle,
    view: watch::Receiver<ViewSnapshot>,
}

impl AppState {
    pub fn new(config: Config, sync: SyncHandle, view: watch::Receiver<ViewSnapshot>) -> Self {
        Self { config, sync, view }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    /// Command side of the sync runner.
    pub fn sync(&self) -> &SyncHandle {
        &self.sync
    }

    /// Latest published view state.
    pub fn snapshot(&self) -> ViewSnapshot {
        self.view.borrow().clone()
    }
}
