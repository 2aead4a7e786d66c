use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::core::errors::ApiError;
use crate::llm::LlmProvider;
use crate::rag::{VectorRecord, VectorStore};
use super::chunker::TextChunk;

/// Embeds chunks and writes them to the vector index.
pub struct Indexer {
    embeddings: Arc<dyn LlmProvider>,
    embedding_model: String,
    store: Arc<dyn VectorStore>,
    batch_size: usize,
}

impl Indexer {
    pub fn new(
        embeddings: Arc<dyn LlmProvider>,
        embedding_model: impl Into<String>,
        store: Arc<dyn VectorStore>,
        batch_size: usize,
    ) -> Self {
        Self {
            embeddings,
            embedding_model: embedding_model.into(),
            store,
            batch_size: batch_size.max(1),
        }
    }

    /// Returns the number of vectors written.
    pub async fn index(&self, chunks: &[TextChunk]) -> Result<usize, ApiError> {
        let mut written = 0;

        for (batch_no, batch) in chunks.chunks(self.batch_size).enumerate() {
            let inputs: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embeddings.embed(&inputs, &self.embedding_model).await?;
            if vectors.len() != batch.len() {
                return Err(ApiError::upstream(
                    "embeddings",
                    format!("expected {} embeddings, got {}", batch.len(), vectors.len()),
                ));
            }

            let records = batch
                .iter()
                .zip(vectors)
                .map(|(chunk, values)| VectorRecord {
                    id: chunk_id(chunk),
                    values,
                    text: chunk.text.clone(),
                    source: chunk.source.clone(),
                    page: Some(chunk.page),
                })
                .collect();

            written += self.store.upsert(records).await?;
            tracing::info!(batch = batch_no + 1, written, total = chunks.len(), "Indexed batch");
        }

        Ok(written)
    }
}

/// Stable id so re-ingesting the same document overwrites its vectors.
pub fn chunk_id(chunk: &TextChunk) -> String {
    let mut hasher = Sha256::new();
    hasher.update(chunk.source.as_bytes());
    hasher.update(chunk.page.to_le_bytes());
    hasher.update((chunk.chunk_index as u64).to_le_bytes());
    hasher.update(chunk.text.as_bytes());
    hex::encode(&hasher.finalize()[..16])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatRequest;
    use crate::rag::{IndexStats, Passage};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct CountingEmbedder {
        calls: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl LlmProvider for CountingEmbedder {
        fn name(&self) -> &str {
            "counting"
        }

        async fn health_check(&self) -> Result<bool, ApiError> {
            Ok(true)
        }

        async fn chat(&self, _request: ChatRequest, _model_id: &str) -> Result<String, ApiError> {
            Ok(String::new())
        }

        async fn embed(&self, inputs: &[String], _model_id: &str) -> Result<Vec<Vec<f32>>, ApiError> {
            self.calls.lock().expect("lock").push(inputs.len());
            Ok(inputs.iter().map(|_| vec![0.5, 0.5]).collect())
        }
    }

    #[derive(Default)]
    struct CollectingStore {
        records: Mutex<Vec<VectorRecord>>,
    }

    #[async_trait]
    impl VectorStore for CollectingStore {
        async fn query(&self, _vector: &[f32], _top_k: usize) -> Result<Vec<Passage>, ApiError> {
            Ok(Vec::new())
        }

        async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, ApiError> {
            let count = records.len();
            self.records.lock().expect("lock").extend(records);
            Ok(count)
        }

        async fn stats(&self) -> Result<IndexStats, ApiError> {
            Ok(IndexStats::default())
        }
    }

    fn chunk(page: u32, index: usize, text: &str) -> TextChunk {
        TextChunk {
            text: text.to_string(),
            source: "gale.pdf".to_string(),
            page,
            chunk_index: index,
            start_offset: 0,
        }
    }

    #[tokio::test]
    async fn embeds_in_batches_and_upserts_with_metadata() {
        let embedder = Arc::new(CountingEmbedder { calls: Mutex::new(Vec::new()) });
        let store = Arc::new(CollectingStore::default());
        let indexer = Indexer::new(embedder.clone(), "mini", store.clone(), 2);
        let chunks: Vec<TextChunk> = (0..5).map(|i| chunk(1, i, &format!("c{}", i))).collect();

        let written = indexer.index(&chunks).await.expect("index");

        assert_eq!(written, 5);
        assert_eq!(*embedder.calls.lock().expect("lock"), vec![2, 2, 1]);
        let records = store.records.lock().expect("lock");
        assert_eq!(records[4].text, "c4");
        assert_eq!(records[4].page, Some(1));
        assert_eq!(records[4].source, "gale.pdf");
    }

    #[test]
    fn chunk_ids_are_stable_and_distinct() {
        let a = chunk(1, 0, "same text");
        let b = chunk(2, 0, "same text");

        assert_eq!(chunk_id(&a), chunk_id(&a.clone()));
        assert_ne!(chunk_id(&a), chunk_id(&b));
        assert_eq!(chunk_id(&a).len(), 32);
    }

    #[test]
    fn chunk_id_hashes_index_as_fixed_width() {
        let c = chunk(7, 3, "Anemia is a condition.");

        let mut hasher = Sha256::new();
        hasher.update(b"gale.pdf");
        hasher.update(7u32.to_le_bytes());
        hasher.update(3u64.to_le_bytes());
        hasher.update(b"Anemia is a condition.");
        assert_eq!(chunk_id(&c), hex::encode(&hasher.finalize()[..16]));
    }
}
