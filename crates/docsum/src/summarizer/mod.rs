//! Summarization engine and its pluggable backends.
//!
//! The `llama` backend is only compiled with the "ai" feature flag.

pub mod backend;
pub mod chunking;
pub mod engine;
pub mod extractive;
pub mod http;
#[cfg(feature = "ai")]
pub mod llama;
#[cfg(feature = "ai")]
pub mod model_manager;
pub mod prompt;

use std::sync::Arc;
use std::time::Duration;

pub use backend::{BackendError, GenerationRequest, SummarizationBackend, SummaryStyle};
pub use engine::{SummarizationEngine, SummaryOptions};
pub use extractive::ExtractiveBackend;
pub use http::HttpBackend;
#[cfg(feature = "ai")]
pub use llama::LlamaBackend;
#[cfg(feature = "ai")]
pub use model_manager::{ModelError, ModelManager};

use crate::config::SummarizerConfig;
use crate::error::ConfigError;

/// Instantiates the backend selected in configuration.
pub fn build_backend(
    config: &SummarizerConfig,
) -> Result<Arc<dyn SummarizationBackend>, ConfigError> {
    match config {
        SummarizerConfig::Extractive { max_input_chars } => {
            Ok(Arc::new(ExtractiveBackend::new(*max_input_chars)))
        }
        SummarizerConfig::Http(http) => {
            let backend = HttpBackend::new(
                &http.base_url,
                &http.model,
                http.max_input_chars,
                Duration::from_secs(http.request_timeout_seconds),
            )
            .map_err(|e| ConfigError::Validation {
                message: e.to_string(),
            })?;
            Ok(Arc::new(backend))
        }
        #[cfg(feature = "ai")]
        SummarizerConfig::Llama(llama) => {
            let model_path = ModelManager::from_config(llama)
                .ensure_model()
                .map_err(|e| ConfigError::Validation {
                    message: e.to_string(),
                })?;
            let backend = LlamaBackend::new(&model_path, llama.context_size, llama.max_input_chars)
                .map_err(|e| ConfigError::Validation {
                    message: e.to_string(),
                })?;
            Ok(Arc::new(backend))
        }
        #[cfg(not(feature = "ai"))]
        SummarizerConfig::Llama(_) => Err(ConfigError::Validation {
            message: "the llama summarizer requires building with the \"ai\" feature".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_extractive() {
        let backend = build_backend(&SummarizerConfig::default()).unwrap();
        assert_eq!(backend.name(), "extractive");
    }

    #[test]
    fn test_build_http() {
        let backend = build_backend(&SummarizerConfig::Http(crate::config::HttpConfig {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            max_input_chars: 4000,
            request_timeout_seconds: 30,
        }))
        .unwrap();
        assert_eq!(backend.name(), "http");
        assert_eq!(backend.max_input_chars(), 4000);
    }

    #[cfg(not(feature = "ai"))]
    #[test]
    fn test_llama_requires_feature() {
        let result = build_backend(&SummarizerConfig::Llama(crate::config::LlamaConfig::default()));
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }
}
