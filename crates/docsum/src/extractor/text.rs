use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

use crate::error::ExtractError;
use crate::extractor::{DocumentExtractor, ExtractLimits};
use crate::submission::Format;

/// Share of control characters above which decoded content is treated as binary.
const MAX_CONTROL_RATIO: f64 = 0.1;

pub struct TextExtractor;

impl TextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentExtractor for TextExtractor {
    fn extract(&self, content: &[u8], _limits: &ExtractLimits) -> Result<String, ExtractError> {
        let _span = tracing::info_span!("extractor.text").entered();
        decode_text(content)
    }

    fn supports(&self, format: Format) -> bool {
        matches!(format, Format::Txt | Format::Plain)
    }
}

/// Decodes bytes with a fallback chain: BOM-declared encoding, strict UTF-8,
/// then Windows-1252 (a superset of Latin-1).
pub fn decode_text(bytes: &[u8]) -> Result<String, ExtractError> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        if !had_errors && !looks_binary(&text) {
            return Ok(text.into_owned());
        }
        tracing::debug!("content does not decode as its BOM-declared {}", encoding.name());
    }

    let (text, had_errors) = UTF_8.decode_without_bom_handling(bytes);
    if !had_errors {
        if looks_binary(&text) {
            return Err(ExtractError::Decode(
                "content looks like binary data".to_string(),
            ));
        }
        return Ok(text.into_owned());
    }

    let (text, had_errors) = WINDOWS_1252.decode_without_bom_handling(bytes);
    if had_errors || looks_binary(&text) {
        return Err(ExtractError::Decode(
            "content is not valid UTF-8 or Latin-1 text".to_string(),
        ));
    }

    Ok(text.into_owned())
}

fn looks_binary(text: &str) -> bool {
    if text.contains('\0') {
        return true;
    }

    let total = text.chars().count();
    if total == 0 {
        return false;
    }
    let control = text
        .chars()
        .filter(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t' | '\u{c}'))
        .count();

    control as f64 / total as f64 > MAX_CONTROL_RATIO
}
