use thiserror::Error;

/// Which of the two summary products a backend call is producing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryStyle {
    Short,
    Detailed,
}

impl SummaryStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryStyle::Short => "short",
            SummaryStyle::Detailed => "detailed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub text: &'a str,
    pub style: SummaryStyle,
    /// Upper bound on output length, counted in whitespace-separated words.
    pub max_tokens: usize,
    /// Desired lower bound; a hint, not enforced.
    pub min_tokens: usize,
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),

    #[error("Inference failed: {0}")]
    Inference(String),
}

/// Opaque text-to-summary capability.
pub trait SummarizationBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Longest input, in characters, a single `generate` call accepts.
    fn max_input_chars(&self) -> usize;

    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, BackendError>;
}
