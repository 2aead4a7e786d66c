//! Prompt assembly for grounded answers.

use crate::llm::ChatMessage;
use super::store::Passage;

/// Separator placed between passage texts in the context block.
pub const PASSAGE_SEPARATOR: &str = "\n\n";

const ANSWER_INSTRUCTION: &str = "**Provide the answer directly, starting immediately with the first word of the answer. Do not include any prefixes, labels, or conversational intros like 'Bot:', 'Answer:', 'AI:', 'System:', 'Here is the answer:', or similar.**";

/// Everything the model sees for one question.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptContext {
    pub system: String,
    pub context: String,
    pub question: String,
}

impl PromptContext {
    /// Context block, then question block, then the no-prefix instruction.
    pub fn user_message(&self) -> String {
        format!(
            "**Context:**\n{}\n\n**Question:** {}\n\n{}",
            self.context, self.question, ANSWER_INSTRUCTION
        )
    }

    pub fn to_messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.system.clone()),
            ChatMessage::user(self.user_message()),
        ]
    }
}

pub fn build(system_text: &str, passages: &[Passage], query: &str) -> PromptContext {
    let context = passages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join(PASSAGE_SEPARATOR);

    PromptContext {
        system: system_text.to_string(),
        context,
        question: query.to_string(),
    }
}

/// Holds the standing system instruction.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system_text: String,
}

impl PromptBuilder {
    pub fn new(system_text: impl Into<String>) -> Self {
        Self {
            system_text: system_text.into(),
        }
    }

    pub fn build(&self, passages: &[Passage], query: &str) -> PromptContext {
        build(&self.system_text, passages, query)
    }
}
