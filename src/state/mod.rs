use std::sync::Arc;

use crate::core::config::{AppConfig, AppPaths, ConfigService};
use crate::llm::{ChatAnswerGenerator, LlmProvider, OpenAiProvider};
use crate::query::QueryHandler;
use crate::rag::{PineconeStore, VectorRetriever, VectorStore};

pub mod error;

use error::InitializationError;

/// Application state shared by every route.
///
/// Built once at startup and read-only afterwards. Holds:
/// - The typed configuration
/// - The query pipeline (retriever + generator behind trait objects)
/// - Handles used by the status endpoint
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: Arc<AppConfig>,
    pub query: Arc<QueryHandler>,
    pub store: Arc<dyn VectorStore>,
    pub chat: Arc<dyn LlmProvider>,
}

impl AppState {
    /// Loads configuration and connects the external services.
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config_service = ConfigService::new(paths.clone());
        let config = config_service
            .load_app_config()
            .map_err(|e| InitializationError::Config(e.into()))?;
        tracing::info!("Loaded configuration from {}", config_service.config_path().display());
        if let Ok(value) = serde_json::to_value(&config) {
            tracing::debug!("Effective configuration: {}", config_service.redact_sensitive_values(&value));
        }

        let store: Arc<dyn VectorStore> = Arc::new(
            PineconeStore::connect(&config.pinecone)
                .await
                .map_err(|e| InitializationError::VectorStore(e.into()))?,
        );

        Ok(Arc::new(Self::from_parts(paths, config, store)))
    }

    /// Wires the pipeline from an already-connected store.
    pub fn from_parts(paths: Arc<AppPaths>, config: AppConfig, store: Arc<dyn VectorStore>) -> Self {
        let chat: Arc<dyn LlmProvider> = Arc::new(OpenAiProvider::new(
            config.chat.base_url.clone(),
            config.chat.api_key.clone(),
        ));
        let embeddings: Arc<dyn LlmProvider> = Arc::new(OpenAiProvider::new(
            config.embedding.base_url.clone(),
            config.embedding.api_key.clone(),
        ));

        let retriever = Arc::new(VectorRetriever::new(
            embeddings,
            config.embedding.model.clone(),
            store.clone(),
        ));
        let generator = Arc::new(ChatAnswerGenerator::new(chat.clone(), config.chat.clone()));
        let query = Arc::new(QueryHandler::new(
            retriever,
            generator,
            config.prompt.clone(),
            config.retrieval.top_k,
        ));

        Self {
            paths,
            config: Arc::new(config),
            query,
            store,
            chat,
        }
    }

    /// State with a caller-supplied query pipeline.
    pub fn with_query(
        paths: Arc<AppPaths>,
        config: AppConfig,
        query: QueryHandler,
        store: Arc<dyn VectorStore>,
        chat: Arc<dyn LlmProvider>,
    ) -> Self {
        Self {
            paths,
            config: Arc::new(config),
            query: Arc::new(query),
            store,
            chat,
        }
    }
}
