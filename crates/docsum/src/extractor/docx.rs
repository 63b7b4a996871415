use std::io::{Cursor, Read, Seek};

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::ExtractError;
use crate::extractor::{DocumentExtractor, ExtractLimits};
use crate::submission::Format;

/// Elements whose text never reaches the output: tables and embedded drawings.
const SKIPPED_ELEMENTS: &[&[u8]] = &[b"tbl", b"drawing", b"pict", b"txbxContent"];

pub struct DocxExtractor;

impl DocxExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DocxExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentExtractor for DocxExtractor {
    fn extract(&self, content: &[u8], limits: &ExtractLimits) -> Result<String, ExtractError> {
        let _span = tracing::info_span!("extractor.docx").entered();

        let mut archive = zip::ZipArchive::new(Cursor::new(content))
            .map_err(|e| ExtractError::Docx(format!("Failed to open DOCX: {}", e)))?;

        let xml = read_document_xml(&mut archive, limits.max_size_bytes)?;
        let paragraphs = parse_paragraphs(&xml)?;

        Ok(paragraphs.join("\n"))
    }

    fn supports(&self, format: Format) -> bool {
        matches!(format, Format::Docx)
    }
}

/// Reads `word/document.xml`, refusing to inflate more than `max_bytes`.
fn read_document_xml<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
    max_bytes: u64,
) -> Result<String, ExtractError> {
    let document_xml = archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractError::Docx(format!("Failed to find document.xml: {}", e)))?;

    let declared = document_xml.size();
    if declared > max_bytes {
        return Err(ExtractError::TooLarge {
            size: declared,
            max: max_bytes,
        });
    }

    // The declared size comes from the archive and may lie.
    let mut xml = Vec::new();
    document_xml
        .take(max_bytes.saturating_add(1))
        .read_to_end(&mut xml)
        .map_err(|e| ExtractError::Docx(format!("Failed to read document.xml: {}", e)))?;

    let inflated = xml.len() as u64;
    if inflated > max_bytes {
        return Err(ExtractError::TooLarge {
            size: inflated,
            max: max_bytes,
        });
    }

    String::from_utf8(xml)
        .map_err(|e| ExtractError::Docx(format!("document.xml is not UTF-8: {}", e)))
}

/// Collects non-empty body paragraphs in document order.
fn parse_paragraphs(xml: &str) -> Result<Vec<String>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut skip_depth = 0usize;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = e.local_name();
                if SKIPPED_ELEMENTS.contains(&name.as_ref()) {
                    skip_depth += 1;
                } else if skip_depth == 0 {
                    match name.as_ref() {
                        b"t" => in_text = true,
                        b"p" => current.clear(),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(ref e)) => {
                let name = e.local_name();
                if SKIPPED_ELEMENTS.contains(&name.as_ref()) {
                    skip_depth = skip_depth.saturating_sub(1);
                } else if skip_depth == 0 {
                    match name.as_ref() {
                        b"t" => in_text = false,
                        b"p" => {
                            let paragraph = current.trim();
                            if !paragraph.is_empty() {
                                paragraphs.push(paragraph.to_string());
                            }
                            current.clear();
                        }
                        _ => {}
                    }
                }
            }
            Ok(Event::Empty(ref e)) if skip_depth == 0 => match e.local_name().as_ref() {
                b"tab" => current.push('\t'),
                b"br" | b"cr" => current.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_text && skip_depth == 0 {
                    let decoded = e.decode().unwrap_or_default();
                    current.push_str(&decoded);
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_text && skip_depth == 0 {
                    if let Ok(Some(ch)) = e.resolve_char_ref() {
                        current.push(ch);
                    } else if let Ok(name) = e.decode() {
                        if let Some(resolved) = quick_xml::escape::resolve_predefined_entity(&name) {
                            current.push_str(resolved);
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ExtractError::Docx(format!("XML parsing error: {}", e)));
            }
            _ => {}
        }
    }

    Ok(paragraphs)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    const NS: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main""#;

    pub(crate) fn build_docx(body: &str) -> Vec<u8> {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document {}><w:body>{}</w:body></w:document>"#,
            NS, body
        );

        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file("[Content_Types].xml", options).unwrap();
            writer
                .write_all(br#"<?xml version="1.0"?><Types/>"#)
                .unwrap();
            writer.start_file("word/document.xml", options).unwrap();
            writer.write_all(xml.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        buffer.into_inner()
    }

    pub(crate) fn paragraph(text: &str) -> String {
        format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", text)
    }

    #[test]
    fn test_paragraphs_in_order() {
        let body = format!("{}{}", paragraph("Introduction"), paragraph("Findings"));
        let text = DocxExtractor::new().extract(&build_docx(&body), &ExtractLimits::default()).unwrap();
        assert_eq!(text, "Introduction\nFindings");
    }

    #[test]
    fn test_runs_are_concatenated() {
        let body = r#"<w:p><w:r><w:t xml:space="preserve">Hello </w:t></w:r><w:r><w:t>world</w:t></w:r></w:p>"#;
        let text = DocxExtractor::new().extract(&build_docx(body), &ExtractLimits::default()).unwrap();
        assert_eq!(text, "Hello world");
    }

    #[test]
    fn test_empty_paragraphs_dropped() {
        let body = format!("{}<w:p/><w:p><w:r><w:t>  </w:t></w:r></w:p>{}", paragraph("A"), paragraph("B"));
        let text = DocxExtractor::new().extract(&build_docx(&body), &ExtractLimits::default()).unwrap();
        assert_eq!(text, "A\nB");
    }

    #[test]
    fn test_tables_are_ignored() {
        let body = format!(
            "{}<w:tbl><w:tr><w:tc>{}</w:tc></w:tr></w:tbl>{}",
            paragraph("Before"),
            paragraph("Cell text"),
            paragraph("After")
        );
        let text = DocxExtractor::new().extract(&build_docx(&body), &ExtractLimits::default()).unwrap();
        assert_eq!(text, "Before\nAfter");
    }

    #[test]
    fn test_escaped_entities_are_decoded() {
        let body = paragraph("R&amp;D budget &lt;draft&gt;");
        let text = DocxExtractor::new().extract(&build_docx(&body), &ExtractLimits::default()).unwrap();
        assert_eq!(text, "R&D budget <draft>");
    }

    #[test]
    fn test_not_a_zip() {
        match DocxExtractor::new().extract(b"plain bytes", &ExtractLimits::default()) {
            Err(ExtractError::Docx(msg)) => assert!(msg.contains("Failed to open DOCX")),
            other => panic!("Expected Docx error, got {:?}", other),
        }
    }

    #[test]
    fn test_zip_without_document_xml() {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            writer
                .start_file("other.txt", zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(b"x").unwrap();
            writer.finish().unwrap();
        }
        match DocxExtractor::new().extract(&buffer.into_inner(), &ExtractLimits::default()) {
            Err(ExtractError::Docx(msg)) => assert!(msg.contains("document.xml")),
            other => panic!("Expected Docx error, got {:?}", other),
        }
    }

    #[test]
    fn test_inflated_document_xml_is_bounded() {
        let body = paragraph(&"compressible ".repeat(200_000));
        let docx = build_docx(&body);
        let limits = ExtractLimits {
            max_size_bytes: 256 * 1024,
            max_chars: 1_000,
        };
        assert!((docx.len() as u64) < limits.max_size_bytes);

        match DocxExtractor::new().extract(&docx, &limits) {
            Err(ExtractError::TooLarge { size, max }) => {
                assert_eq!(max, limits.max_size_bytes);
                assert!(size > max);
            }
            other => panic!("Expected TooLarge, got {:?}", other),
        }
    }

    #[test]
    fn test_small_document_xml_within_limit() {
        let docx = build_docx(&paragraph("Short memo"));
        let limits = ExtractLimits {
            max_size_bytes: 64 * 1024,
            max_chars: 1_000,
        };
        assert_eq!(DocxExtractor::new().extract(&docx, &limits).unwrap(), "Short memo");
    }
}
