use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub response: String,
}

/// `POST /get`. Always answers 200 with a reply string; a body that is not
/// the expected JSON counts as an empty question.
pub async fn get_bot_response(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Json<QueryResponse> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::warn!("Unreadable request body: {}", rejection.body_text());
            QueryRequest::default()
        }
    };

    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("query", %request_id);
    let outcome = state
        .query
        .handle(request.query.as_deref())
        .instrument(span)
        .await;
    tracing::info!(%request_id, outcome = outcome.kind(), "Query finished");

    Json(QueryResponse {
        response: outcome.into_reply(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{AppConfig, AppPaths, PromptConfig};
    use crate::core::errors::ApiError;
    use crate::llm::{AnswerGenerator, ChatRequest, LlmProvider};
    use crate::query::QueryHandler;
    use crate::rag::{IndexStats, Passage, PromptContext, Retriever, VectorRecord, VectorStore};
    use crate::server::router::router;
    use crate::test_support::spawn_fake;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct StaticRetriever(Vec<&'static str>);

    #[async_trait]
    impl Retriever for StaticRetriever {
        async fn search(&self, _query: &str, _k: usize) -> Result<Vec<Passage>, ApiError> {
            Ok(self.0.iter().map(|t| Passage::new(*t, "gale.pdf")).collect())
        }
    }

    struct EchoContext;

    #[async_trait]
    impl AnswerGenerator for EchoContext {
        async fn generate(&self, prompt: &PromptContext) -> Result<String, ApiError> {
            Ok(prompt.context.clone())
        }
    }

    struct IdleStore;

    #[async_trait]
    impl VectorStore for IdleStore {
        async fn query(&self, _vector: &[f32], _top_k: usize) -> Result<Vec<Passage>, ApiError> {
            Ok(Vec::new())
        }

        async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, ApiError> {
            Ok(records.len())
        }

        async fn stats(&self) -> Result<IndexStats, ApiError> {
            Ok(IndexStats::default())
        }
    }

    struct IdleProvider;

    #[async_trait]
    impl LlmProvider for IdleProvider {
        fn name(&self) -> &str {
            "idle"
        }

        async fn health_check(&self) -> Result<bool, ApiError> {
            Ok(true)
        }

        async fn chat(&self, _request: ChatRequest, _model_id: &str) -> Result<String, ApiError> {
            Ok(String::new())
        }

        async fn embed(&self, _inputs: &[String], _model_id: &str) -> Result<Vec<Vec<f32>>, ApiError> {
            Ok(Vec::new())
        }
    }

    async fn serve(passages: Vec<&'static str>) -> String {
        let query = QueryHandler::new(
            Arc::new(StaticRetriever(passages)),
            Arc::new(EchoContext),
            PromptConfig::default(),
            10,
        );
        let state = AppState::with_query(
            Arc::new(AppPaths::from_root(std::env::temp_dir())),
            AppConfig::default(),
            query,
            Arc::new(IdleStore),
            Arc::new(IdleProvider),
        );
        spawn_fake(router(Arc::new(state))).await
    }

    async fn post(base: &str, body: reqwest::Body, json_content: bool) -> (u16, Value) {
        let mut req = reqwest::Client::new().post(format!("{}/get", base)).body(body);
        if json_content {
            req = req.header("content-type", "application/json");
        }
        let res = req.send().await.expect("send");
        let status = res.status().as_u16();
        (status, res.json().await.expect("json body"))
    }

    #[tokio::test]
    async fn answers_with_response_field() {
        let base = serve(vec!["90/60mmHg to 120/80mmHg"]).await;

        let (status, body) = post(
            &base,
            json!({"query": "What is the normal blood pressure range?"}).to_string().into(),
            true,
        )
        .await;

        assert_eq!(status, 200);
        assert_eq!(body, json!({"response": "90/60mmHg to 120/80mmHg"}));
    }

    #[tokio::test]
    async fn missing_or_blank_query_prompts_for_input() {
        let base = serve(vec!["unused"]).await;

        for body in [json!({}), json!({"query": ""}), json!({"query": "   "}), json!({"query": null})] {
            let (status, reply) = post(&base, body.to_string().into(), true).await;
            assert_eq!(status, 200);
            assert_eq!(reply["response"], "Please enter a message.");
        }
    }

    #[tokio::test]
    async fn malformed_body_still_gets_200() {
        let base = serve(vec!["unused"]).await;

        let (status, reply) = post(&base, "not json".into(), true).await;
        assert_eq!(status, 200);
        assert_eq!(reply["response"], "Please enter a message.");

        let (status, reply) = post(&base, "{\"query\":\"x\"}".into(), false).await;
        assert_eq!(status, 200);
        assert_eq!(reply["response"], "Please enter a message.");
    }

    #[tokio::test]
    async fn empty_index_gives_no_answer_message() {
        let base = serve(Vec::new()).await;

        let (status, reply) = post(&base, json!({"query": "fever"}).to_string().into(), true).await;

        assert_eq!(status, 200);
        assert_eq!(
            reply["response"],
            "I couldn't find a relevant answer in the documents."
        );
    }
}
