// Application state module
// Holds configuration and the shared hit counter handed to every handler

use std::path::PathBuf;
use std::sync::Arc;

use super::types::Config;
use crate::counter::HitCounter;

/// Application state
pub struct AppState {
    pub config: Config,
    pub hits: Arc<HitCounter>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            hits: Arc::new(HitCounter::new()),
        }
    }

    /// Root directory for the `/app/` file server
    pub fn file_root(&self) -> PathBuf {
        PathBuf::from(&self.config.files.root)
    }

    pub const fn access_log(&self) -> bool {
        self.config.logging.access_log
    }
}
