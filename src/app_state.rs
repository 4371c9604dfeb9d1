use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::gemini::{GeminiClient, GeminiError};
use crate::services::recovery::FileRecoveryStore;

/// Shared application state passed to all command handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub gemini: Arc<GeminiClient>,
    pub recovery: Arc<FileRecoveryStore>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, GeminiError> {
        let gemini = GeminiClient::new(
            &config.gemini_base_url,
            &config.gemini_api_key,
            config.download_timeout(),
        )?;
        let recovery = FileRecoveryStore::new(config.recovery_marker_path.clone());

        Ok(Self {
            config: Arc::new(config),
            gemini: Arc::new(gemini),
            recovery: Arc::new(recovery),
        })
    }
}
