pub mod docx;
pub mod pdf;
pub mod text;

use std::panic::{self, AssertUnwindSafe};

use crate::error::ExtractError;
use crate::submission::Format;

pub use docx::DocxExtractor;
pub use pdf::PdfExtractor;
pub use text::TextExtractor;

pub const DEFAULT_MAX_DOCUMENT_SIZE_BYTES: u64 = 25 * 1024 * 1024;
pub const DEFAULT_MAX_EXTRACT_CHARS: usize = 60_000;

/// Converts the raw bytes of one format into plain text.
pub trait DocumentExtractor: Send + Sync {
    /// `limits.max_size_bytes` also bounds anything the extractor inflates.
    fn extract(&self, content: &[u8], limits: &ExtractLimits) -> Result<String, ExtractError>;
    fn supports(&self, format: Format) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractLimits {
    pub max_size_bytes: u64,
    /// Extracted text beyond this many characters is cut off.
    pub max_chars: usize,
}

impl Default for ExtractLimits {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_DOCUMENT_SIZE_BYTES,
            max_chars: DEFAULT_MAX_EXTRACT_CHARS,
        }
    }
}

pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn DocumentExtractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        let extractors: Vec<Box<dyn DocumentExtractor>> = vec![
            Box::new(PdfExtractor::new()),
            Box::new(DocxExtractor::new()),
            Box::new(TextExtractor::new()),
        ];

        Self { extractors }
    }

    pub fn extract(
        &self,
        content: &[u8],
        format: Format,
        limits: &ExtractLimits,
    ) -> Result<String, ExtractError> {
        let _span = tracing::info_span!(
            "extractor.extract",
            format = %format,
            size = content.len()
        )
        .entered();

        let size = content.len() as u64;
        if size > limits.max_size_bytes {
            return Err(ExtractError::TooLarge {
                size,
                max: limits.max_size_bytes,
            });
        }

        let extractor = self
            .extractors
            .iter()
            .find(|e| e.supports(format))
            .ok_or_else(|| ExtractError::UnsupportedFormat(format.to_string()))?;

        // lopdf and quick-xml can panic on malformed input.
        let text = panic::catch_unwind(AssertUnwindSafe(|| extractor.extract(content, limits)))
            .map_err(|payload| ExtractError::Extraction(panic_message(payload.as_ref())))??;

        let text = text.trim();
        if text.is_empty() {
            return Err(ExtractError::NoTextFound);
        }

        let text = truncate_chars(text, limits.max_chars);
        tracing::debug!(chars = text.chars().count(), "extracted text");
        Ok(text)
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("extractor panicked: {}", msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("extractor panicked: {}", msg)
    } else {
        "extractor panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PanickingExtractor;

    impl DocumentExtractor for PanickingExtractor {
        fn extract(&self, _content: &[u8], _limits: &ExtractLimits) -> Result<String, ExtractError> {
            panic!("corrupt cross-reference table");
        }

        fn supports(&self, format: Format) -> bool {
            matches!(format, Format::Pdf)
        }
    }

    #[test]
    fn test_size_is_checked_before_extraction() {
        let registry = ExtractorRegistry::new();
        let limits = ExtractLimits {
            max_size_bytes: 4,
            max_chars: 100,
        };
        match registry.extract(b"hello", Format::Txt, &limits) {
            Err(ExtractError::TooLarge { size, max }) => {
                assert_eq!(size, 5);
                assert_eq!(max, 4);
            }
            other => panic!("Expected TooLarge, got {:?}", other),
        }
    }

    #[test]
    fn test_size_at_limit_is_accepted() {
        let registry = ExtractorRegistry::new();
        let limits = ExtractLimits {
            max_size_bytes: 5,
            max_chars: 100,
        };
        assert_eq!(registry.extract(b"hello", Format::Txt, &limits).unwrap(), "hello");
    }

    #[test]
    fn test_text_is_trimmed_and_truncated() {
        let registry = ExtractorRegistry::new();
        let limits = ExtractLimits {
            max_size_bytes: 1024,
            max_chars: 5,
        };
        let text = registry
            .extract("   héllo wörld  \n".as_bytes(), Format::Plain, &limits)
            .unwrap();
        assert_eq!(text, "héllo");
    }

    #[test]
    fn test_whitespace_only_is_no_text() {
        let registry = ExtractorRegistry::new();
        match registry.extract(b" \n\t ", Format::Txt, &ExtractLimits::default()) {
            Err(ExtractError::NoTextFound) => {}
            other => panic!("Expected NoTextFound, got {:?}", other),
        }
    }

    #[test]
    fn test_panic_becomes_extraction_failure() {
        let registry = ExtractorRegistry {
            extractors: vec![Box::new(PanickingExtractor)],
        };
        match registry.extract(b"%PDF-1.4", Format::Pdf, &ExtractLimits::default()) {
            Err(ExtractError::Extraction(msg)) => {
                assert!(msg.contains("corrupt cross-reference table"));
            }
            other => panic!("Expected Extraction error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_extractor_is_unsupported() {
        let registry = ExtractorRegistry { extractors: vec![] };
        match registry.extract(b"abc", Format::Docx, &ExtractLimits::default()) {
            Err(ExtractError::UnsupportedFormat(name)) => assert_eq!(name, "DOCX"),
            other => panic!("Expected UnsupportedFormat, got {:?}", other),
        }
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("日本語テキスト", 3), "日本語");
        assert_eq!(truncate_chars("short", 10), "short");
    }
}
