//! Summarization through an Ollama-compatible `/api/generate` endpoint.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::summarizer::backend::{BackendError, GenerationRequest, SummarizationBackend};
use crate::summarizer::prompt::{build_user_message, SYSTEM_PROMPT};

pub struct HttpBackend {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    max_input_chars: usize,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    /// Ollama wraps `system` and `prompt` in the model's own chat template.
    system: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    num_predict: usize,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl HttpBackend {
    pub fn new(
        base_url: &str,
        model: &str,
        max_input_chars: usize,
        request_timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| BackendError::Unavailable(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/generate", base_url.trim_end_matches('/')),
            model: model.to_string(),
            max_input_chars,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl SummarizationBackend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    fn max_input_chars(&self) -> usize {
        self.max_input_chars
    }

    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, BackendError> {
        let _span = tracing::info_span!(
            "summarizer.http",
            model = %self.model,
            style = request.style.as_str()
        )
        .entered();

        let body = GenerateRequest {
            model: &self.model,
            system: SYSTEM_PROMPT,
            prompt: build_user_message(request),
            stream: false,
            options: GenerateOptions {
                // Words run roughly 1.3 tokens; leave headroom and clip afterwards.
                num_predict: request.max_tokens * 2,
                temperature: 0.2,
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .map_err(|e| BackendError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Request(format!(
                "{} returned HTTP {}",
                self.endpoint, status
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        Ok(parsed.response.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summarizer::backend::SummaryStyle;

    #[test]
    fn test_endpoint_normalized() {
        let backend =
            HttpBackend::new("http://localhost:11434/", "llama3", 8000, Duration::from_secs(5))
                .unwrap();
        assert_eq!(backend.endpoint(), "http://localhost:11434/api/generate");
        assert_eq!(backend.max_input_chars(), 8000);
        assert_eq!(backend.name(), "http");
    }

    #[test]
    fn test_unreachable_server_is_request_error() {
        let backend =
            HttpBackend::new("http://127.0.0.1:1", "llama3", 8000, Duration::from_secs(2)).unwrap();
        let result = backend.generate(&GenerationRequest {
            text: "Some document text.",
            style: SummaryStyle::Short,
            max_tokens: 20,
            min_tokens: 5,
        });
        match result {
            Err(BackendError::Request(_)) => {}
            other => panic!("Expected Request error, got {:?}", other),
        }
    }

    #[test]
    fn test_response_parsing() {
        let parsed: GenerateResponse =
            serde_json::from_str(r#"{"model":"llama3","response":" A summary. ","done":true}"#)
                .unwrap();
        assert_eq!(parsed.response.trim(), "A summary.");
    }

    #[test]
    fn test_request_body_leaves_templating_to_server() {
        let request = GenerationRequest {
            text: "Quarterly figures.",
            style: SummaryStyle::Short,
            max_tokens: 20,
            min_tokens: 5,
        };
        let body = GenerateRequest {
            model: "llama3",
            system: SYSTEM_PROMPT,
            prompt: build_user_message(&request),
            stream: false,
            options: GenerateOptions {
                num_predict: 40,
                temperature: 0.2,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["system"], SYSTEM_PROMPT);
        let prompt = json["prompt"].as_str().unwrap();
        assert!(prompt.ends_with("Quarterly figures."));
        assert!(!prompt.contains("<|im_start|>"));
        assert!(json.get("raw").is_none());
    }
}
