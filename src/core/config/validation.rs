use serde_json::{Map, Value};
use crate::core::errors::ApiError;

pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, 65535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    if let Some(pinecone) = expect_optional_object(root, "pinecone")? {
        validate_non_empty_string_field(pinecone, "pinecone.index_name", "index_name")?;
        validate_optional_string_field(pinecone, "pinecone.index_host", "index_host")?;
        validate_optional_string_field(pinecone, "pinecone.namespace", "namespace")?;
    }

    if let Some(chat) = expect_optional_object(root, "chat")? {
        validate_non_empty_string_field(chat, "chat.model", "model")?;
        validate_non_empty_string_field(chat, "chat.base_url", "base_url")?;
        validate_f64_field(chat, "chat.temperature", "temperature", 0.0, 2.0)?;
        validate_u64_field(chat, "chat.max_tokens", "max_tokens", 1, 1_000_000)?;
    }

    if let Some(embedding) = expect_optional_object(root, "embedding")? {
        validate_non_empty_string_field(embedding, "embedding.model", "model")?;
        validate_non_empty_string_field(embedding, "embedding.base_url", "base_url")?;
        validate_u64_field(embedding, "embedding.batch_size", "batch_size", 1, 2_048)?;
    }

    if let Some(retrieval) = expect_optional_object(root, "retrieval")? {
        validate_u64_field(retrieval, "retrieval.top_k", "top_k", 1, 100)?;
    }

    if let Some(prompt) = expect_optional_object(root, "prompt")? {
        validate_non_empty_string_field(prompt, "prompt.system_prompt", "system_prompt")?;
        validate_string_array_field(prompt, "prompt.fallback_phrases", "fallback_phrases")?;
        validate_non_empty_string_field(
            prompt,
            "prompt.empty_input_message",
            "empty_input_message",
        )?;
        validate_non_empty_string_field(prompt, "prompt.no_answer_message", "no_answer_message")?;
        validate_non_empty_string_field(prompt, "prompt.failure_message", "failure_message")?;
    }

    if let Some(parser) = expect_optional_object(root, "parser")? {
        validate_optional_string_field(parser, "parser.language", "language")?;
        validate_u64_field(parser, "parser.num_workers", "num_workers", 1, 64)?;
        validate_u64_field(
            parser,
            "parser.poll_interval_ms",
            "poll_interval_ms",
            1,
            60_000,
        )?;
        validate_u64_field(parser, "parser.max_wait_secs", "max_wait_secs", 1, 86_400)?;
    }

    if let Some(ingest) = expect_optional_object(root, "ingest")? {
        validate_u64_field(ingest, "ingest.chunk_size", "chunk_size", 1, 100_000)?;
        validate_u64_field(ingest, "ingest.chunk_overlap", "chunk_overlap", 0, 100_000)?;
        if let (Some(size), Some(overlap)) = (
            ingest.get("chunk_size").and_then(Value::as_u64),
            ingest.get("chunk_overlap").and_then(Value::as_u64),
        ) {
            if overlap >= size {
                return Err(ApiError::Config(
                    "Invalid config at 'ingest.chunk_overlap': must be smaller than chunk_size"
                        .to_string(),
                ));
            }
        }
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ApiError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(out_of_range(path, min, max));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if number < min || number > max {
        return Err(out_of_range(path, min, max));
    }
    Ok(())
}

fn validate_non_empty_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(ApiError::Config(format!(
            "Invalid config at '{}': value cannot be empty",
            path
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() || value.as_str().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "string"))
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ApiError::Config(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn out_of_range<T: std::fmt::Display>(path: &str, min: T, max: T) -> ApiError {
    ApiError::Config(format!(
        "Invalid config at '{}': must be between {} and {}",
        path, min, max
    ))
}

fn config_type_error(path: &str, expected: &str) -> ApiError {
    ApiError::Config(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_empty_document() {
        assert!(validate_config(&json!({})).is_ok());
    }

    #[test]
    fn rejects_top_k_out_of_range() {
        let err = validate_config(&json!({"retrieval": {"top_k": 0}})).unwrap_err();
        assert!(err.to_string().contains("retrieval.top_k"));
    }

    #[test]
    fn rejects_temperature_above_two() {
        let err = validate_config(&json!({"chat": {"temperature": 2.5}})).unwrap_err();
        assert!(err.to_string().contains("chat.temperature"));
    }

    #[test]
    fn rejects_overlap_not_smaller_than_chunk_size() {
        let result = validate_config(&json!({
            "ingest": {"chunk_size": 100, "chunk_overlap": 100}
        }));
        assert!(result.is_err());
    }

    #[test]
    fn rejects_blank_index_name() {
        let result = validate_config(&json!({"pinecone": {"index_name": "  "}}));
        assert!(matches!(result, Err(ApiError::Config(_))));
    }

    #[test]
    fn rejects_section_with_wrong_type() {
        let result = validate_config(&json!({"chat": "gpt"}));
        assert!(result.is_err());
    }
}
