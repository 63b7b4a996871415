/// Where summarization of an extracted submission runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// On the caller's thread, before intake returns.
    Inline,
    /// On the worker pool.
    Queued,
}

/// Texts of at most `threshold_chars` characters run inline.
pub fn decide(text: &str, threshold_chars: usize) -> Dispatch {
    if text.chars().count() <= threshold_chars {
        Dispatch::Inline
    } else {
        Dispatch::Queued
    }
}
