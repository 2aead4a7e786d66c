pub const DEFAULT_INDEX_NAME: &str = "medicalbot";
pub const DEFAULT_TOP_K: usize = 10;
pub const DEFAULT_TEMPERATURE: f64 = 0.3;
pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

pub const EMPTY_INPUT_MESSAGE: &str = "Please enter a message.";
pub const NO_ANSWER_MESSAGE: &str = "I couldn't find a relevant answer in the documents.";
pub const FAILURE_MESSAGE: &str = "I'm sorry, I encountered a critical error. Please try again.";

pub const SYSTEM_PROMPT: &str = "\
You are a highly knowledgeable and precise medical chatbot.
Your primary function is to answer health-related questions accurately and directly, *strictly based on the provided medical context*.

**When the user asks for a 'normal', 'regular', or 'healthy' range for any medical measurement (e.g., blood pressure, heart rate, temperature), you must prioritize and state the standard healthy or typical values. Do not provide definitions of abnormal or high values unless specifically asked for them, or if the normal range is not found.**

If the provided context does not contain the answer, explicitly state: \"I cannot find specific information on that topic in the provided medical texts.\"
Avoid any speculation, subjective interpretations, or information not directly supported by the context.";

/// Answers the model is told to give when the context has nothing relevant.
pub fn fallback_phrases() -> Vec<String> {
    vec![
        "I cannot find specific information on that topic in the provided medical texts."
            .to_string(),
        "I'm sorry, I cannot answer this question based on the provided medical documents. Please ask me about medical topics."
            .to_string(),
    ]
}
