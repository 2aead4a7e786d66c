//! Retrieval side of the query flow.
//!
//! - `VectorStore`: hosted vector index (`PineconeStore`)
//! - `Retriever`: question in, ranked passages out (`VectorRetriever`)
//! - `PromptBuilder`: passages plus question into a chat prompt

pub mod pinecone;
pub mod prompt;
pub mod retriever;
pub mod store;

pub use pinecone::PineconeStore;
pub use prompt::{PromptBuilder, PromptContext};
pub use retriever::{Retriever, VectorRetriever};
pub use store::{IndexStats, Passage, VectorRecord, VectorStore};
