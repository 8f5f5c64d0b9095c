//! Server state management.

use std::sync::Arc;

use retain_core::classifier::LlmClassifier;
use retain_core::config::RetainConfig;
use retain_core::engine::ReviewEngine;
use retain_core::error::RetainResult;
use retain_core::store::{ReviewRepository, SqliteStore};
use retain_llm::LlmFactory;
use tracing::info;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ReviewEngine>,
    /// Name of the classifier's service, for health reporting.
    pub classifier_service: String,
    pub classifier_configured: bool,
}

impl AppState {
    pub fn new(repo: Arc<dyn ReviewRepository>, classifier: LlmClassifier) -> Self {
        let classifier_service = classifier.service().to_string();
        let classifier_configured = classifier.is_configured();
        Self {
            engine: Arc::new(ReviewEngine::new(repo, Arc::new(classifier))),
            classifier_service,
            classifier_configured,
        }
    }

    /// Open the store and build the classifier described by `config`.
    pub fn from_config(config: &RetainConfig) -> RetainResult<Self> {
        let store = SqliteStore::new(&config.database_path)?;
        info!(path = %config.database_path.display(), "Opened review database");

        Ok(Self::new(
            Arc::new(store),
            LlmFactory::classifier(&config.classifier),
        ))
    }
}
