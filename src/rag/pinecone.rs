//! Pinecone REST client.
//!
//! Metadata layout follows the LangChain convention used when the index
//! was built: chunk text under `text`, plus `source` and `page`.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::core::config::PineconeConfig;
use crate::core::errors::ApiError;
use super::store::{IndexStats, Passage, VectorRecord, VectorStore};

const SERVICE: &str = "pinecone";
const UPSERT_BATCH: usize = 100;

#[derive(Clone)]
pub struct PineconeStore {
    client: Client,
    host: String,
    api_key: String,
    api_version: String,
    namespace: Option<String>,
}

#[derive(Deserialize)]
struct DescribeIndexResponse {
    host: String,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: Option<f32>,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: Option<usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    #[serde(default)]
    dimension: Option<u32>,
    #[serde(default)]
    total_vector_count: u64,
}

impl PineconeStore {
    /// Connects to the configured index, asking the control plane for its
    /// data-plane host unless one is configured.
    pub async fn connect(config: &PineconeConfig) -> Result<Self, ApiError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ApiError::Config("PINECONE_API_KEY is not set".to_string()))?;
        let client = Client::new();

        let host = match config.index_host.as_deref().filter(|h| !h.trim().is_empty()) {
            Some(host) => host.to_string(),
            None => resolve_host(&client, config, &api_key).await?,
        };

        tracing::info!(index = %config.index_name, host = %host, "Connected to Pinecone index");
        Ok(Self::with_host(host, api_key, config))
    }

    pub fn with_host(host: impl Into<String>, api_key: impl Into<String>, config: &PineconeConfig) -> Self {
        Self {
            client: Client::new(),
            host: normalize_host(&host.into()),
            api_key: api_key.into(),
            api_version: config.api_version.clone(),
            namespace: config.namespace.clone().filter(|ns| !ns.is_empty()),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", &self.api_version)
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.host, path);
        let res = self
            .request(self.client.post(&url))
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::upstream(SERVICE, e))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::upstream(
                SERVICE,
                format!("{} failed ({}): {}", path, status, text),
            ));
        }

        res.json().await.map_err(|e| ApiError::upstream(SERVICE, e))
    }
}

async fn resolve_host(
    client: &Client,
    config: &PineconeConfig,
    api_key: &str,
) -> Result<String, ApiError> {
    let url = format!(
        "{}/indexes/{}",
        config.control_plane_url.trim_end_matches('/'),
        config.index_name
    );
    let res = client
        .get(&url)
        .header("Api-Key", api_key)
        .header("X-Pinecone-API-Version", &config.api_version)
        .send()
        .await
        .map_err(|e| ApiError::upstream(SERVICE, e))?;

    if !res.status().is_success() {
        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        return Err(ApiError::upstream(
            SERVICE,
            format!("describe index '{}' failed ({}): {}", config.index_name, status, text),
        ));
    }

    let described: DescribeIndexResponse =
        res.json().await.map_err(|e| ApiError::upstream(SERVICE, e))?;
    Ok(described.host)
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

fn passage_from_match(m: QueryMatch) -> Passage {
    let metadata = m.metadata.unwrap_or_default();
    let text = metadata
        .get("text")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let source = metadata
        .get("source")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or(m.id);
    let page = metadata.get("page").and_then(|v| {
        v.as_u64()
            .or_else(|| v.as_f64().map(|f| f as u64))
            .map(|p| p as u32)
    });

    Passage {
        text,
        source,
        page,
        score: m.score,
    }
}

fn record_to_json(record: VectorRecord) -> Value {
    let mut metadata = json!({
        "text": record.text,
        "source": record.source,
    });
    if let (Some(page), Some(obj)) = (record.page, metadata.as_object_mut()) {
        obj.insert("page".to_string(), json!(page));
    }
    json!({
        "id": record.id,
        "values": record.values,
        "metadata": metadata,
    })
}

#[async_trait]
impl VectorStore for PineconeStore {
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<Passage>, ApiError> {
        let mut body = json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
            "includeValues": false,
        });
        if let (Some(ns), Some(obj)) = (&self.namespace, body.as_object_mut()) {
            obj.insert("namespace".to_string(), json!(ns));
        }

        let payload = self.post_json("/query", &body).await?;
        let response: QueryResponse =
            serde_json::from_value(payload).map_err(|e| ApiError::upstream(SERVICE, e))?;

        Ok(response.matches.into_iter().map(passage_from_match).collect())
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, ApiError> {
        let mut written = 0;
        let mut pending = records.into_iter().peekable();

        while pending.peek().is_some() {
            let batch: Vec<Value> = pending.by_ref().take(UPSERT_BATCH).map(record_to_json).collect();
            let batch_len = batch.len();
            let mut body = json!({ "vectors": batch });
            if let (Some(ns), Some(obj)) = (&self.namespace, body.as_object_mut()) {
                obj.insert("namespace".to_string(), json!(ns));
            }

            let payload = self.post_json("/vectors/upsert", &body).await?;
            let response: UpsertResponse =
                serde_json::from_value(payload).map_err(|e| ApiError::upstream(SERVICE, e))?;
            written += response.upserted_count.unwrap_or(batch_len);
        }

        Ok(written)
    }

    async fn stats(&self) -> Result<IndexStats, ApiError> {
        let payload = self.post_json("/describe_index_stats", &json!({})).await?;
        let response: StatsResponse =
            serde_json::from_value(payload).map_err(|e| ApiError::upstream(SERVICE, e))?;
        Ok(IndexStats {
            dimension: response.dimension,
            total_vector_count: response.total_vector_count,
        })
    }
}
