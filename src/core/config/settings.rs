//! Typed view over the merged `config.yml` + `secrets.yaml` document.
//!
//! Every field has a default so an empty config file yields a runnable
//! server once credentials are supplied through the environment.

use serde::{Deserialize, Serialize};

use super::defaults;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub pinecone: PineconeConfig,
    pub chat: ChatConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub prompt: PromptConfig,
    pub parser: ParserConfig,
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PineconeConfig {
    pub api_key: Option<String>,
    pub index_name: String,
    /// Data-plane host; resolved through the control plane when unset.
    pub index_host: Option<String>,
    pub control_plane_url: String,
    pub namespace: Option<String>,
    pub api_version: String,
}

impl Default for PineconeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            index_name: defaults::DEFAULT_INDEX_NAME.to_string(),
            index_host: None,
            control_plane_url: "https://api.pinecone.io".to_string(),
            namespace: None,
            api_version: "2024-07".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key: None,
            model: defaults::DEFAULT_CHAT_MODEL.to_string(),
            temperature: defaults::DEFAULT_TEMPERATURE,
            max_tokens: defaults::DEFAULT_MAX_TOKENS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Any server exposing an OpenAI-compatible `/v1/embeddings` route.
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8081".to_string(),
            api_key: None,
            model: defaults::DEFAULT_EMBEDDING_MODEL.to_string(),
            batch_size: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: defaults::DEFAULT_TOP_K,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub system_prompt: String,
    pub fallback_phrases: Vec<String>,
    pub empty_input_message: String,
    pub no_answer_message: String,
    pub failure_message: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_prompt: defaults::SYSTEM_PROMPT.to_string(),
            fallback_phrases: defaults::fallback_phrases(),
            empty_input_message: defaults::EMPTY_INPUT_MESSAGE.to_string(),
            no_answer_message: defaults::NO_ANSWER_MESSAGE.to_string(),
            failure_message: defaults::FAILURE_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    Markdown,
    Text,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub language: String,
    pub result_type: ResultType,
    pub num_workers: usize,
    pub poll_interval_ms: u64,
    pub max_wait_secs: u64,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.cloud.llamaindex.ai".to_string(),
            api_key: None,
            language: "en".to_string(),
            result_type: ResultType::Markdown,
            num_workers: 4,
            poll_interval_ms: 1_000,
            max_wait_secs: 1_800,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 20,
        }
    }
}
