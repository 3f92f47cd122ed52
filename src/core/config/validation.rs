use serde_json::{Map, Value};

use crate::core::errors::ConfigError;

const PROVIDERS: [&str; 2] = ["gemini", "openai_compatible"];

pub fn validate_config(config: &Value) -> Result<(), ConfigError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, 65_535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    if let Some(rag) = expect_optional_object(root, "rag")? {
        validate_u64_field(rag, "rag.chunk_size", "chunk_size", 1, 1_000_000)?;
        validate_bool_field(rag, "rag.deduplicate", "deduplicate")?;
    }

    if let Some(llm) = expect_optional_object(root, "llm")? {
        if let Some(provider) = llm.get("provider") {
            let Some(name) = provider.as_str() else {
                return Err(config_type_error("llm.provider", "string"));
            };
            if !PROVIDERS.contains(&name) {
                return Err(ConfigError::invalid(
                    "llm.provider",
                    format!("must be one of {}", PROVIDERS.join(", ")),
                ));
            }
        }
        validate_u64_field(
            llm,
            "llm.request_timeout_secs",
            "request_timeout_secs",
            1,
            86_400,
        )?;

        for backend in PROVIDERS {
            if let Some(section) = expect_optional_object(llm, backend)? {
                let prefix = format!("llm.{}", backend);
                validate_non_empty_string_field(section, &format!("{}.base_url", prefix), "base_url")?;
                validate_optional_string_field(section, &format!("{}.api_key", prefix), "api_key")?;
                validate_non_empty_string_field(
                    section,
                    &format!("{}.embedding_model", prefix),
                    "embedding_model",
                )?;
                validate_non_empty_string_field(
                    section,
                    &format!("{}.generation_model", prefix),
                    "generation_model",
                )?;
            }
        }
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ConfigError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(config_type_error(key, "object")),
    }
}

fn validate_bool_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() || value.as_bool().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "boolean"))
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() {
        return Ok(());
    }
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ConfigError::invalid(
            path,
            format!("must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

fn validate_non_empty_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key).filter(|v| !v.is_null()) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(ConfigError::invalid(path, "value cannot be empty"));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
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
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key).filter(|v| !v.is_null()) else {
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
            return Err(ConfigError::invalid(
                format!("{}[{}]", path, index),
                "value cannot be empty",
            ));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ConfigError {
    ConfigError::invalid(path, format!("expected {}", expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_full_config() {
        let config = json!({
            "server": { "host": "127.0.0.1", "port": 8000, "cors_allowed_origins": ["http://localhost:5173"] },
            "rag": { "chunk_size": 500, "deduplicate": false },
            "llm": {
                "provider": "gemini",
                "request_timeout_secs": 60,
                "gemini": { "api_key": "k", "embedding_model": "models/embedding-001" }
            }
        });
        validate_config(&config).expect("valid config");
    }

    #[test]
    fn rejects_unknown_provider() {
        let err = validate_config(&json!({ "llm": { "provider": "cohere" } }))
            .expect_err("must fail");
        assert!(err.to_string().contains("llm.provider"));
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(validate_config(&json!({ "rag": "big" })).is_err());
        assert!(validate_config(&json!({ "rag": { "deduplicate": "yes" } })).is_err());
        assert!(validate_config(&json!({ "server": { "port": 70000 } })).is_err());
        assert!(validate_config(&json!({ "llm": { "gemini": { "base_url": " " } } })).is_err());
    }

    #[test]
    fn null_sections_are_treated_as_absent() {
        validate_config(&json!({ "rag": null, "llm": { "request_timeout_secs": null } }))
            .expect("nulls are allowed");
    }

    #[test]
    fn empty_yaml_keys_are_treated_as_absent() {
        let raw: Value = serde_yaml::from_str(
            "server:\n  cors_allowed_origins:\nrag:\n  deduplicate:\nllm:\n  gemini:\n    base_url:\n    generation_model:\n",
        )
        .expect("yaml");
        validate_config(&raw).expect("empty keys are allowed");
    }
}
