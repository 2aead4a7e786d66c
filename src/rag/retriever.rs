use std::sync::Arc;

use async_trait::async_trait;

use crate::core::errors::ApiError;
use crate::llm::LlmProvider;
use super::store::{Passage, VectorStore};

/// Finds the passages most similar to a question.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Up to `k` passages, most similar first.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Passage>, ApiError>;
}

/// Embeds the query and asks the vector store for its nearest neighbours.
pub struct VectorRetriever {
    embeddings: Arc<dyn LlmProvider>,
    embedding_model: String,
    store: Arc<dyn VectorStore>,
}

impl VectorRetriever {
    pub fn new(
        embeddings: Arc<dyn LlmProvider>,
        embedding_model: impl Into<String>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            embeddings,
            embedding_model: embedding_model.into(),
            store,
        }
    }
}

#[async_trait]
impl Retriever for VectorRetriever {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Passage>, ApiError> {
        let mut vectors = self
            .embeddings
            .embed(&[query.to_string()], &self.embedding_model)
            .await?;
        let vector = vectors
            .pop()
            .ok_or_else(|| ApiError::upstream("embeddings", "no embedding returned for query"))?;

        self.store.query(&vector, k).await
    }
}
