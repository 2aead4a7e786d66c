//! Per-request orchestration: validate, retrieve, generate, pick the reply.
//!
//! Every path ends in a user-readable string; failures never escape.

use std::sync::Arc;

use crate::core::config::PromptConfig;
use crate::core::text::preview;
use crate::llm::AnswerGenerator;
use crate::rag::{PromptBuilder, Retriever};

/// How a request ended. Only `reply()` reaches the client.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// No question was supplied.
    EmptyInput(String),
    /// The vector search failed.
    RetrievalFailed(String),
    /// The chat completion failed.
    GenerationFailed(String),
    /// Nothing relevant was found, or the model said so.
    NoGrounding(String),
    Answered(String),
}

impl QueryOutcome {
    pub fn reply(&self) -> &str {
        match self {
            QueryOutcome::EmptyInput(text)
            | QueryOutcome::RetrievalFailed(text)
            | QueryOutcome::GenerationFailed(text)
            | QueryOutcome::NoGrounding(text)
            | QueryOutcome::Answered(text) => text,
        }
    }

    pub fn into_reply(self) -> String {
        match self {
            QueryOutcome::EmptyInput(text)
            | QueryOutcome::RetrievalFailed(text)
            | QueryOutcome::GenerationFailed(text)
            | QueryOutcome::NoGrounding(text)
            | QueryOutcome::Answered(text) => text,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            QueryOutcome::EmptyInput(_) => "empty_input",
            QueryOutcome::RetrievalFailed(_) => "retrieval_failed",
            QueryOutcome::GenerationFailed(_) => "generation_failed",
            QueryOutcome::NoGrounding(_) => "no_grounding",
            QueryOutcome::Answered(_) => "answered",
        }
    }
}

pub struct QueryHandler {
    retriever: Arc<dyn Retriever>,
    generator: Arc<dyn AnswerGenerator>,
    prompts: PromptBuilder,
    messages: PromptConfig,
    top_k: usize,
}

impl QueryHandler {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        generator: Arc<dyn AnswerGenerator>,
        messages: PromptConfig,
        top_k: usize,
    ) -> Self {
        Self {
            retriever,
            generator,
            prompts: PromptBuilder::new(messages.system_prompt.clone()),
            messages,
            top_k,
        }
    }

    pub async fn handle(&self, query: Option<&str>) -> QueryOutcome {
        let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) else {
            tracing::debug!("Received empty query");
            return QueryOutcome::EmptyInput(self.messages.empty_input_message.clone());
        };

        let passages = match self.retriever.search(query, self.top_k).await {
            Ok(passages) => passages,
            Err(err) => {
                tracing::error!("Retrieval failed: {}", err);
                return QueryOutcome::RetrievalFailed(self.messages.failure_message.clone());
            }
        };

        tracing::debug!(count = passages.len(), "Retrieved passages");
        for (i, passage) in passages.iter().enumerate() {
            tracing::debug!(
                rank = i + 1,
                source = %passage.source,
                page = ?passage.page,
                score = ?passage.score,
                "{}",
                preview(&passage.text, 400)
            );
        }

        if passages.is_empty() {
            tracing::info!("No passages matched; skipping generation");
            return QueryOutcome::NoGrounding(self.messages.no_answer_message.clone());
        }

        let prompt = self.prompts.build(&passages, query);
        let answer = match self.generator.generate(&prompt).await {
            Ok(answer) => answer,
            Err(err) => {
                tracing::error!("Generation failed: {}", err);
                return QueryOutcome::GenerationFailed(self.messages.failure_message.clone());
            }
        };

        let trimmed = answer.trim();
        if trimmed.is_empty() {
            tracing::info!("Model returned an empty answer");
            return QueryOutcome::NoGrounding(self.messages.no_answer_message.clone());
        }
        if self.is_fallback(trimmed) {
            tracing::info!("Model returned a fallback answer");
            return QueryOutcome::NoGrounding(answer);
        }

        QueryOutcome::Answered(answer)
    }

    fn is_fallback(&self, answer: &str) -> bool {
        self.messages
            .fallback_phrases
            .iter()
            .any(|phrase| phrase.trim() == answer)
    }
}
