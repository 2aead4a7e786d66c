pub mod generator;
pub mod openai;
pub mod provider;
pub mod types;

pub use generator::{AnswerGenerator, ChatAnswerGenerator};
pub use openai::OpenAiProvider;
pub use provider::LlmProvider;
pub use types::{ChatMessage, ChatRequest};
