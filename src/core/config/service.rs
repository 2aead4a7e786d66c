use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::settings::AppConfig;
use super::validation::validate_config;
use crate::core::errors::ApiError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 10] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "token_",
    "credential",
    "private_key",
    "access_key",
    "access_token",
    "bearer",
];

const SENSITIVE_WHITELIST: [&str; 4] = ["max_tokens", "total_tokens", "token_count", "tokens"];

/// Environment variables that override values read from disk.
const ENV_OVERRIDES: [(&str, &[&str]); 5] = [
    ("PINECONE_API_KEY", &["pinecone", "api_key"]),
    ("OPENAI_API_KEY", &["chat", "api_key"]),
    ("EMBEDDING_API_KEY", &["embedding", "api_key"]),
    ("LLAMA_CLOUD_API_KEY", &["parser", "api_key"]),
    ("PORT", &["server", "port"]),
];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("MEDIBOT_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    /// Public config deep-merged with the secrets file.
    pub fn load_config(&self) -> Result<Value, ApiError> {
        let public_config = load_yaml_file(&self.config_path())?;
        let secrets_config = load_yaml_file(&self.secrets_path())?;
        Ok(deep_merge(&public_config, &secrets_config))
    }

    /// Loads, applies process environment overrides, validates and types the config.
    pub fn load_app_config(&self) -> Result<AppConfig, ApiError> {
        self.load_app_config_with(|key| env::var(key).ok())
    }

    pub fn load_app_config_with<F>(&self, lookup: F) -> Result<AppConfig, ApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut merged = self.load_config()?;
        apply_env_overrides(&mut merged, lookup);
        validate_config(&merged)?;
        serde_json::from_value(merged)
            .map_err(|e| ApiError::Config(format!("Invalid config: {}", e)))
    }

    pub fn redact_sensitive_values(&self, value: &Value) -> Value {
        redact_sensitive_values(value)
    }
}

fn load_yaml_file(path: &Path) -> Result<Value, ApiError> {
    if !path.exists() {
        return Ok(Value::Object(Map::new()));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        ApiError::Config(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let value = serde_yaml::from_str::<Value>(&contents).map_err(|e| {
        ApiError::Config(format!("Failed to parse {}: {}", path.display(), e))
    })?;
    match value {
        Value::Object(_) => Ok(value),
        Value::Null => Ok(Value::Object(Map::new())),
        _ => Err(ApiError::Config(format!(
            "{} must contain a mapping at the top level",
            path.display()
        ))),
    }
}

fn apply_env_overrides<F>(config: &mut Value, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for (var, path) in ENV_OVERRIDES {
        let Some(raw) = lookup(var).filter(|v| !v.trim().is_empty()) else {
            continue;
        };
        let value = match raw.trim().parse::<u64>() {
            Ok(number) if var == "PORT" => Value::from(number),
            _ => Value::String(raw),
        };
        ensure_object_path(config, path, value);
    }
}

pub fn ensure_object_path(config: &mut Value, path: &[&str], value: Value) {
    if path.is_empty() {
        return;
    }

    let mut current = config;
    for (index, key) in path.iter().enumerate() {
        if index == path.len() - 1 {
            if let Some(map) = current.as_object_mut() {
                map.insert(key.to_string(), value);
            }
            return;
        }

        if !current.get(*key).map(|v| v.is_object()).unwrap_or(false) {
            let Some(map) = current.as_object_mut() else {
                return;
            };
            map.insert((*key).to_string(), Value::Object(Map::new()));
        }

        let Some(next) = current.get_mut(*key) else {
            return;
        };
        current = next;
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, val) in map {
                if is_sensitive_key(key) && !val.is_null() {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    if SENSITIVE_WHITELIST
        .iter()
        .any(|allowed| *allowed == key_lower)
    {
        return false;
    }
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| key_lower.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn service_in(dir: &Path) -> ConfigService {
        ConfigService::new(Arc::new(AppPaths::from_root(dir)))
    }

    #[test]
    fn deep_merge_merges_objects_and_overrides_scalars() {
        let base = json!({
            "a": 1,
            "b": { "c": 2, "d": 3 },
            "arr": [1, 2]
        });
        let override_value = json!({
            "b": { "c": 99 },
            "arr": [3],
            "e": "x"
        });

        let merged = deep_merge(&base, &override_value);

        assert_eq!(
            merged,
            json!({
                "a": 1,
                "b": { "c": 99, "d": 3 },
                "arr": [3],
                "e": "x"
            })
        );
    }

    #[test]
    fn redact_sensitive_values_replaces_secrets_only() {
        let input = json!({
            "pinecone": { "api_key": "pc-secret", "index_name": "medicalbot" },
            "chat": { "api_key": null, "max_tokens": 500 }
        });

        let redacted = redact_sensitive_values(&input);

        assert_eq!(
            redacted,
            json!({
                "pinecone": { "api_key": "****", "index_name": "medicalbot" },
                "chat": { "api_key": null, "max_tokens": 500 }
            })
        );
    }

    #[test]
    fn ensure_object_path_creates_missing_sections() {
        let mut config = json!({});
        ensure_object_path(&mut config, &["pinecone", "api_key"], json!("k"));
        assert_eq!(config, json!({"pinecone": {"api_key": "k"}}));
    }

    #[test]
    fn missing_files_yield_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = service_in(dir.path())
            .load_app_config_with(|_| None)
            .expect("defaults load");

        assert_eq!(config.pinecone.index_name, "medicalbot");
        assert_eq!(config.retrieval.top_k, 10);
        assert_eq!(config.chat.max_tokens, 500);
        assert!((config.chat.temperature - 0.3).abs() < f64::EPSILON);
        assert!(config.chat.api_key.is_none());
    }

    #[test]
    fn secrets_file_and_env_are_layered_over_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join("config.yml"),
            "retrieval:\n  top_k: 7\nchat:\n  temperature: 0.4\n",
        )
        .expect("write config");
        fs::write(
            dir.path().join("secrets.yaml"),
            "pinecone:\n  api_key: from-file\n",
        )
        .expect("write secrets");

        let config = service_in(dir.path())
            .load_app_config_with(|key| match key {
                "OPENAI_API_KEY" => Some("sk-env".to_string()),
                "PORT" => Some("9000".to_string()),
                _ => None,
            })
            .expect("config loads");

        assert_eq!(config.retrieval.top_k, 7);
        assert!((config.chat.temperature - 0.4).abs() < f64::EPSILON);
        assert_eq!(config.pinecone.api_key.as_deref(), Some("from-file"));
        assert_eq!(config.chat.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("config.yml"), "retrieval:\n  top_k: 500\n")
            .expect("write config");

        let result = service_in(dir.path()).load_app_config_with(|_| None);
        assert!(matches!(result, Err(ApiError::Config(_))));
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("config.yml"), "chat: [unterminated\n").expect("write config");

        assert!(service_in(dir.path()).load_config().is_err());
    }
}
