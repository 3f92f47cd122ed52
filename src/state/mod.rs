use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::core::config::{AppConfig, AppPaths, ConfigService};
use crate::llm::LlmBackends;
use crate::orchestrator::{Orchestrator, OrchestratorSettings};

pub mod error;

use error::InitializationError;

/// Application state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config_service: ConfigService,
    pub config: Arc<AppConfig>,
    pub orchestrator: Orchestrator,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Load configuration, resolve the LLM backends and start the coordinator.
    ///
    /// Must be called from within a tokio runtime.
    pub fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config_service = ConfigService::new(paths.clone());
        let config = config_service.load()?;
        tracing::info!(
            "Loaded config from {} (provider: {:?}, chunk_size: {})",
            config_service.config_path().display(),
            config.llm.provider,
            config.rag.chunk_size
        );

        let backends = LlmBackends::from_config(&config.llm).map_err(InitializationError::Llm)?;
        let settings =
            OrchestratorSettings::from_config(&config.rag).map_err(InitializationError::Rag)?;
        let orchestrator = Orchestrator::spawn(backends.embedder, backends.generator, settings);

        Ok(Self::from_parts(paths, config_service, config, orchestrator))
    }

    pub fn from_parts(
        paths: Arc<AppPaths>,
        config_service: ConfigService,
        config: AppConfig,
        orchestrator: Orchestrator,
    ) -> Arc<Self> {
        Arc::new(AppState {
            paths,
            config_service,
            config: Arc::new(config),
            orchestrator,
            started_at: Utc::now(),
        })
    }
}
