use crate::error::ExtractError;
use crate::extractor::{DocumentExtractor, ExtractLimits};
use crate::submission::Format;

pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentExtractor for PdfExtractor {
    fn extract(&self, content: &[u8], _limits: &ExtractLimits) -> Result<String, ExtractError> {
        let _span = tracing::info_span!("extractor.pdf").entered();

        let doc = lopdf::Document::load_mem(content)
            .map_err(|e| ExtractError::Pdf(format!("Failed to load PDF: {}", e)))?;

        let text = extract_pages(&doc);
        if text.is_empty() {
            // Scanned or image-only documents land here.
            return Err(ExtractError::NoTextFound);
        }

        Ok(text)
    }

    fn supports(&self, format: Format) -> bool {
        matches!(format, Format::Pdf)
    }
}

/// Joins the text of every page that yields any, in page order.
fn extract_pages(doc: &lopdf::Document) -> String {
    let mut pages = Vec::new();

    for (page_num, _) in doc.get_pages() {
        match doc.extract_text(&[page_num]) {
            Ok(page_text) => {
                let page_text = page_text.trim();
                if !page_text.is_empty() {
                    pages.push(page_text.to_string());
                }
            }
            Err(e) => {
                tracing::debug!(page = page_num, "skipping page without text: {}", e);
            }
        }
    }

    pages.join("\n")
}
