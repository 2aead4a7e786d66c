//! VectorStore trait — abstract interface over the hosted vector index.
//!
//! The index itself (ANN structure, similarity metric) belongs to the
//! external service; this layer only moves vectors and metadata.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

/// A retrieved unit of source text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// The text content of the passage.
    pub text: String,
    /// Source identifier (file name, URL, ...).
    pub source: String,
    /// Page in the source document, when known.
    pub page: Option<u32>,
    /// Similarity score reported by the store (higher = better).
    pub score: Option<f32>,
}

impl Passage {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            page: None,
            score: None,
        }
    }
}

/// A vector as written to the index.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub text: String,
    pub source: String,
    pub page: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    pub dimension: Option<u32>,
    pub total_vector_count: u64,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Nearest passages to `vector`, best match first, at most `top_k`.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<Passage>, ApiError>;

    /// Insert or overwrite records by id. Returns the number written.
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, ApiError>;

    async fn stats(&self) -> Result<IndexStats, ApiError>;
}
