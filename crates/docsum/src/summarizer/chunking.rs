//! Sentence-aware text helpers shared by the engine and the extractive backend.

use std::sync::LazyLock;

use regex::Regex;
use text_splitter::{Characters, ChunkConfig, TextSplitter};

/// Splits `text` into segments of at most `max_chars` characters, preferring
/// sentence boundaries over word boundaries.
pub fn split_segments(text: &str, max_chars: usize) -> Vec<String> {
    let config = ChunkConfig::new(max_chars.max(1))
        .with_sizer(Characters)
        .with_trim(true);
    let splitter = TextSplitter::new(config);
    splitter.chunks(text).map(|s: &str| s.to_string()).collect()
}

static RE_SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+\s+|\n{2,}").unwrap());

/// Splits text into trimmed sentences. Terminal punctuation stays attached.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for m in RE_SENTENCE_END.find_iter(text) {
        let sentence = text[start..m.end()].trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        start = m.end();
    }

    let rest = text[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }

    sentences
}

pub fn count_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Keeps the first `max_tokens` words.
pub fn clip_tokens(text: &str, max_tokens: usize) -> String {
    if count_tokens(text) <= max_tokens {
        return text.trim().to_string();
    }
    text.split_whitespace()
        .take(max_tokens)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Formats prose as a `- ` bulleted outline, one sentence per line.
pub fn to_bullets(text: &str) -> String {
    split_sentences(text)
        .iter()
        .map(|s| s.trim_end_matches(['.', '!', '?']).trim())
        .filter(|s| !s.is_empty())
        .map(|s| format!("- {}", s))
        .collect::<Vec<_>>()
        .join("\n")
}
