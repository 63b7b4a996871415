//! Dependency-free extractive summarizer.
//!
//! Scores sentences by the frequency of their content words and keeps the
//! best ones, in their original order, within the requested word budget.
//! Deterministic for identical input.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::summarizer::backend::{
    BackendError, GenerationRequest, SummarizationBackend, SummaryStyle,
};
use crate::summarizer::chunking::{clip_tokens, count_tokens, split_sentences};

pub const DEFAULT_MAX_INPUT_CHARS: usize = 12_000;

static RE_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").unwrap());

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "has", "have", "his", "how", "its", "may", "new", "now", "see", "who",
    "did", "get", "him", "let", "she", "too", "use", "that", "this", "with", "from", "they",
    "will", "would", "there", "their", "what", "about", "which", "when", "were", "been", "into",
    "than", "then", "them", "these", "those", "also", "such", "only", "other", "some", "more",
    "most", "very", "just", "over", "each",
];

pub struct ExtractiveBackend {
    max_input_chars: usize,
}

impl ExtractiveBackend {
    pub fn new(max_input_chars: usize) -> Self {
        Self { max_input_chars }
    }
}

impl Default for ExtractiveBackend {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_INPUT_CHARS)
    }
}

impl SummarizationBackend for ExtractiveBackend {
    fn name(&self) -> &str {
        "extractive"
    }

    fn max_input_chars(&self) -> usize {
        self.max_input_chars
    }

    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, BackendError> {
        let sentences = split_sentences(request.text);
        if sentences.is_empty() {
            return Ok(String::new());
        }

        let frequencies = word_frequencies(request.text);
        let mut ranked: Vec<(usize, f64)> = sentences
            .iter()
            .enumerate()
            .map(|(idx, sentence)| (idx, score_sentence(sentence, &frequencies)))
            .collect();

        // Short summaries favour the opening of the document on ties; detailed
        // notes take sentences purely on score.
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        if request.style == SummaryStyle::Short {
            if let Some(pos) = ranked.iter().position(|(idx, _)| *idx == 0) {
                let lead = ranked.remove(pos);
                ranked.insert(0, lead);
            }
        }

        let mut chosen = Vec::new();
        let mut budget = 0;
        for (idx, _) in ranked {
            let words = count_tokens(&sentences[idx]);
            if !chosen.is_empty() && budget + words > request.max_tokens {
                if budget >= request.min_tokens {
                    break;
                }
                continue;
            }
            chosen.push(idx);
            budget += words;
            if budget >= request.max_tokens {
                break;
            }
        }

        chosen.sort_unstable();
        let summary = chosen
            .iter()
            .map(|&idx| sentences[idx].as_str())
            .collect::<Vec<_>>()
            .join(" ");

        Ok(clip_tokens(&summary, request.max_tokens))
    }
}

fn word_frequencies(text: &str) -> HashMap<String, usize> {
    let mut frequencies = HashMap::new();
    for word in RE_WORD.find_iter(text) {
        let word = word.as_str().to_lowercase();
        if is_content_word(&word) {
            *frequencies.entry(word).or_insert(0) += 1;
        }
    }
    frequencies
}

fn score_sentence(sentence: &str, frequencies: &HashMap<String, usize>) -> f64 {
    let mut total = 0usize;
    let mut words = 0usize;
    for word in RE_WORD.find_iter(sentence) {
        let word = word.as_str().to_lowercase();
        if is_content_word(&word) {
            total += frequencies.get(&word).copied().unwrap_or(0);
            words += 1;
        }
    }
    if words == 0 {
        0.0
    } else {
        total as f64 / words as f64
    }
}

fn is_content_word(word: &str) -> bool {
    word.chars().count() > 2 && !STOPWORDS.contains(&word)
}
