use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::schema::Config;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

const ENV_PREFIX: &str = "DOCSUM_";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

/// Loads the file when given (defaults otherwise), then applies `DOCSUM_*`
/// environment overrides.
pub fn load_with_env(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };

    apply_env_overrides(&mut config)?;
    validate_config(&config)?;

    Ok(config)
}

pub fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigError> {
    override_from_env("MAX_DOCUMENT_SIZE_BYTES", &mut config.max_document_size_bytes)?;
    override_from_env("MAX_EXTRACT_CHARS", &mut config.max_extract_chars)?;
    override_from_env("SYNC_SIZE_THRESHOLD_CHARS", &mut config.sync_size_threshold_chars)?;
    override_from_env("SHORT_MAX_TOKENS", &mut config.short_max_tokens)?;
    override_from_env("SHORT_MIN_TOKENS", &mut config.short_min_tokens)?;
    override_from_env("DETAILED_MAX_TOKENS", &mut config.detailed_max_tokens)?;
    override_from_env("DETAILED_MIN_TOKENS", &mut config.detailed_min_tokens)?;
    override_from_env(
        "SUMMARIZATION_TIMEOUT_SECONDS",
        &mut config.summarization_timeout_seconds,
    )?;
    override_from_env("WORKER_COUNT", &mut config.worker_count)?;
    override_from_env("QUEUE_CAPACITY", &mut config.queue_capacity)?;

    if let Ok(path) = std::env::var(format!("{}DATABASE_PATH", ENV_PREFIX)) {
        if !path.trim().is_empty() {
            config.database_path = Some(PathBuf::from(path));
        }
    }

    Ok(())
}

fn override_from_env<T: FromStr>(suffix: &str, target: &mut T) -> Result<(), ConfigError> {
    let name = format!("{}{}", ENV_PREFIX, suffix);
    if let Ok(value) = std::env::var(&name) {
        *target = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::EnvOverride { name, value })?;
    }
    Ok(())
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    let positive = [
        ("max_document_size_bytes", config.max_document_size_bytes),
        ("max_extract_chars", config.max_extract_chars as u64),
        ("short_max_tokens", config.short_max_tokens as u64),
        ("detailed_max_tokens", config.detailed_max_tokens as u64),
        (
            "summarization_timeout_seconds",
            config.summarization_timeout_seconds,
        ),
        ("worker_count", config.worker_count as u64),
        ("queue_capacity", config.queue_capacity as u64),
    ];
    for (name, value) in positive {
        if value == 0 {
            return Err(ConfigError::Validation {
                message: format!("{} must be greater than 0", name),
            });
        }
    }

    if config.short_min_tokens > config.short_max_tokens {
        return Err(ConfigError::Validation {
            message: format!(
                "short_min_tokens ({}) exceeds short_max_tokens ({})",
                config.short_min_tokens, config.short_max_tokens
            ),
        });
    }
    if config.detailed_min_tokens > config.detailed_max_tokens {
        return Err(ConfigError::Validation {
            message: format!(
                "detailed_min_tokens ({}) exceeds detailed_max_tokens ({})",
                config.detailed_min_tokens, config.detailed_max_tokens
            ),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::SummarizerConfig;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_load_valid_config() {
        let config_json = r#"
        {
            "version": "1.0",
            "max_document_size_bytes": 1048576,
            "sync_size_threshold_chars": 1000,
            "short_max_tokens": 40,
            "worker_count": 2,
            "summarizer": { "backend": "extractive", "max_input_chars": 5000 }
        }
        "#;

        let config = load_config_from_str(config_json).unwrap();
        assert_eq!(config.max_document_size_bytes, 1_048_576);
        assert_eq!(config.sync_size_threshold_chars, 1000);
        assert_eq!(config.short_max_tokens, 40);
        assert_eq!(config.worker_count, 2);
        assert_eq!(
            config.summarizer,
            SummarizerConfig::Extractive {
                max_input_chars: 5000
            }
        );
    }

    #[test]
    fn test_unknown_field_fails_schema() {
        let result = load_config_from_str(r#"{"version": "1.0", "input_directory": "/in"}"#);
        match result {
            Err(ConfigError::SchemaValidation { .. }) => {}
            other => panic!("Expected SchemaValidation, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_version_fails() {
        let result = load_config_from_str(r#"{"version": "2.0"}"#);
        assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
    }

    #[test]
    fn test_negative_limit_fails_schema() {
        let result = load_config_from_str(r#"{"version": "1.0", "short_max_tokens": -5}"#);
        assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
    }

    #[test]
    fn test_http_backend_requires_model() {
        let result =
            load_config_from_str(r#"{"version": "1.0", "summarizer": {"backend": "http"}}"#);
        assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
    }

    #[test]
    fn test_min_above_max_fails() {
        let result = load_config_from_str(
            r#"{"version": "1.0", "short_min_tokens": 80, "short_max_tokens": 60}"#,
        );
        match result {
            Err(ConfigError::Validation { message }) => {
                assert!(message.contains("short_min_tokens"))
            }
            other => panic!("Expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_json() {
        let result = load_config_from_str("{ not json");
        assert!(matches!(result, Err(ConfigError::ParseJson(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"version": "1.0", "queue_capacity": 8}}"#).unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.queue_capacity, 8);
    }

    #[test]
    fn test_missing_file() {
        match load_config("/nonexistent/docsum.json") {
            Err(ConfigError::ReadFile { path, .. }) => {
                assert_eq!(path, PathBuf::from("/nonexistent/docsum.json"))
            }
            other => panic!("Expected ReadFile, got {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        std::env::set_var("DOCSUM_SYNC_SIZE_THRESHOLD_CHARS", "1234");
        std::env::set_var("DOCSUM_DATABASE_PATH", "/tmp/docsum-test.db");
        let config = load_with_env(None);
        std::env::remove_var("DOCSUM_SYNC_SIZE_THRESHOLD_CHARS");
        std::env::remove_var("DOCSUM_DATABASE_PATH");

        let config = config.unwrap();
        assert_eq!(config.sync_size_threshold_chars, 1234);
        assert_eq!(
            config.database_path,
            Some(PathBuf::from("/tmp/docsum-test.db"))
        );
    }

    #[test]
    #[serial]
    fn test_env_override_rejects_garbage() {
        std::env::set_var("DOCSUM_WORKER_COUNT", "many");
        let result = load_with_env(None);
        std::env::remove_var("DOCSUM_WORKER_COUNT");

        match result {
            Err(ConfigError::EnvOverride { name, value }) => {
                assert_eq!(name, "DOCSUM_WORKER_COUNT");
                assert_eq!(value, "many");
            }
            other => panic!("Expected EnvOverride, got {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_env_override_is_validated() {
        std::env::set_var("DOCSUM_QUEUE_CAPACITY", "0");
        let result = load_with_env(None);
        std::env::remove_var("DOCSUM_QUEUE_CAPACITY");

        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }
}
