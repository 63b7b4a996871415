use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default = "default_max_document_size_bytes")]
    pub max_document_size_bytes: u64,
    #[serde(default = "default_max_extract_chars")]
    pub max_extract_chars: usize,
    /// Extracted text up to this many characters is summarized inline.
    #[serde(default = "default_sync_size_threshold_chars")]
    pub sync_size_threshold_chars: usize,
    #[serde(default = "default_short_max_tokens")]
    pub short_max_tokens: usize,
    #[serde(default = "default_short_min_tokens")]
    pub short_min_tokens: usize,
    #[serde(default = "default_detailed_max_tokens")]
    pub detailed_max_tokens: usize,
    #[serde(default = "default_detailed_min_tokens")]
    pub detailed_min_tokens: usize,
    #[serde(default = "default_summarization_timeout_seconds")]
    pub summarization_timeout_seconds: u64,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// SQLite file; `None` means `~/.docsum/data/docsum.db`.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
}

fn default_max_document_size_bytes() -> u64 {
    crate::extractor::DEFAULT_MAX_DOCUMENT_SIZE_BYTES
}

fn default_max_extract_chars() -> usize {
    crate::extractor::DEFAULT_MAX_EXTRACT_CHARS
}

fn default_sync_size_threshold_chars() -> usize {
    40_000
}

fn default_short_max_tokens() -> usize {
    60
}

fn default_short_min_tokens() -> usize {
    15
}

fn default_detailed_max_tokens() -> usize {
    180
}

fn default_detailed_min_tokens() -> usize {
    60
}

fn default_summarization_timeout_seconds() -> u64 {
    120
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

fn default_queue_capacity() -> usize {
    256
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            max_document_size_bytes: default_max_document_size_bytes(),
            max_extract_chars: default_max_extract_chars(),
            sync_size_threshold_chars: default_sync_size_threshold_chars(),
            short_max_tokens: default_short_max_tokens(),
            short_min_tokens: default_short_min_tokens(),
            detailed_max_tokens: default_detailed_max_tokens(),
            detailed_min_tokens: default_detailed_min_tokens(),
            summarization_timeout_seconds: default_summarization_timeout_seconds(),
            worker_count: default_worker_count(),
            queue_capacity: default_queue_capacity(),
            database_path: None,
            summarizer: SummarizerConfig::default(),
        }
    }
}

/// Which summarization backend to run, with its settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum SummarizerConfig {
    Extractive {
        #[serde(default = "default_extractive_input_chars")]
        max_input_chars: usize,
    },
    Http(HttpConfig),
    Llama(LlamaConfig),
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        SummarizerConfig::Extractive {
            max_input_chars: default_extractive_input_chars(),
        }
    }
}

fn default_extractive_input_chars() -> usize {
    crate::summarizer::extractive::DEFAULT_MAX_INPUT_CHARS
}

/// Ollama-compatible generation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_base_url")]
    pub base_url: String,
    pub model: String,
    #[serde(default = "default_http_input_chars")]
    pub max_input_chars: usize,
    #[serde(default = "default_http_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_http_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_http_input_chars() -> usize {
    8_000
}

fn default_http_timeout() -> u64 {
    60
}

/// Local GGUF model, fetched from Hugging Face on first use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlamaConfig {
    /// Directory to cache downloaded models.
    #[serde(default = "default_model_cache")]
    pub model_cache_dir: String,
    /// Model repository on Hugging Face.
    #[serde(default = "default_model_repo")]
    pub model_repo: String,
    /// Model filename (GGUF format).
    #[serde(default = "default_model_file")]
    pub model_file: String,
    #[serde(default = "default_context_size")]
    pub context_size: u32,
    #[serde(default = "default_llama_input_chars")]
    pub max_input_chars: usize,
}

fn default_model_cache() -> String {
    dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .map(|p| p.join("docsum").join("models").to_string_lossy().to_string())
        .unwrap_or_else(|| std::env::temp_dir().join("docsum-models").to_string_lossy().to_string())
}

fn default_model_repo() -> String {
    "Qwen/Qwen2.5-1.5B-Instruct-GGUF".to_string()
}

fn default_model_file() -> String {
    "qwen2.5-1.5b-instruct-q4_k_m.gguf".to_string()
}

fn default_context_size() -> u32 {
    4096
}

fn default_llama_input_chars() -> usize {
    6_000
}

impl Default for LlamaConfig {
    fn default() -> Self {
        Self {
            model_cache_dir: default_model_cache(),
            model_repo: default_model_repo(),
            model_file: default_model_file(),
            context_size: default_context_size(),
            max_input_chars: default_llama_input_chars(),
        }
    }
}
