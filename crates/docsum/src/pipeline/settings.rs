use std::time::Duration;

use crate::config::Config;
use crate::extractor::ExtractLimits;
use crate::summarizer::SummaryOptions;

/// Runtime-tunable limits. Each dispatch captures an `Arc` of the current
/// value so later changes never reach in-flight work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub max_document_size_bytes: u64,
    pub max_extract_chars: usize,
    pub sync_size_threshold_chars: usize,
    pub short_max_tokens: usize,
    pub short_min_tokens: usize,
    pub detailed_max_tokens: usize,
    pub detailed_min_tokens: usize,
    pub summarization_timeout: Duration,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_document_size_bytes: config.max_document_size_bytes,
            max_extract_chars: config.max_extract_chars,
            sync_size_threshold_chars: config.sync_size_threshold_chars,
            short_max_tokens: config.short_max_tokens,
            short_min_tokens: config.short_min_tokens,
            detailed_max_tokens: config.detailed_max_tokens,
            detailed_min_tokens: config.detailed_min_tokens,
            summarization_timeout: Duration::from_secs(config.summarization_timeout_seconds),
        }
    }

    pub fn extract_limits(&self) -> ExtractLimits {
        ExtractLimits {
            max_size_bytes: self.max_document_size_bytes,
            max_chars: self.max_extract_chars,
        }
    }

    pub fn summary_options(&self) -> SummaryOptions {
        SummaryOptions {
            short_max_tokens: self.short_max_tokens,
            short_min_tokens: self.short_min_tokens,
            detailed_max_tokens: self.detailed_max_tokens,
            detailed_min_tokens: self.detailed_min_tokens,
            timeout: self.summarization_timeout,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
