use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError};

use crate::error::SummarizeError;
use crate::submission::{Mode, SummaryResult};
use crate::summarizer::backend::{GenerationRequest, SummarizationBackend, SummaryStyle};
use crate::summarizer::chunking::{clip_tokens, split_segments, to_bullets};

/// Hierarchical reduction stops after this many rounds and truncates instead.
const MAX_REDUCTION_DEPTH: usize = 4;

/// Segments smaller than this make reduction pointless.
const MIN_SEGMENT_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryOptions {
    pub short_max_tokens: usize,
    pub short_min_tokens: usize,
    pub detailed_max_tokens: usize,
    pub detailed_min_tokens: usize,
    pub timeout: Duration,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            short_max_tokens: 60,
            short_min_tokens: 15,
            detailed_max_tokens: 180,
            detailed_min_tokens: 60,
            timeout: Duration::from_secs(120),
        }
    }
}

/// Drives a summarization backend according to the requested mode.
#[derive(Clone)]
pub struct SummarizationEngine {
    backend: Arc<dyn SummarizationBackend>,
}

impl SummarizationEngine {
    pub fn new(backend: Arc<dyn SummarizationBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Summarizes `text` under a wall-clock timeout.
    ///
    /// The backend calls run on their own thread. On timeout that thread
    /// finishes the call in flight, makes no further calls and its result is
    /// discarded.
    pub fn summarize(
        &self,
        text: &str,
        mode: Mode,
        options: &SummaryOptions,
    ) -> Result<SummaryResult, SummarizeError> {
        if text.trim().is_empty() {
            return Err(SummarizeError::EmptyInput);
        }

        let (tx, rx) = bounded(1);
        let backend = Arc::clone(&self.backend);
        let text = text.to_string();
        let thread_options = options.clone();
        let cancelled = Arc::new(AtomicBool::new(false));
        let thread_cancelled = Arc::clone(&cancelled);

        thread::Builder::new()
            .name("docsum-summarize".to_string())
            .spawn(move || {
                let result = run_products(
                    backend.as_ref(),
                    &text,
                    mode,
                    &thread_options,
                    &thread_cancelled,
                );
                // Receiver is gone after a timeout.
                let _ = tx.send(result);
            })
            .map_err(|e| {
                SummarizeError::Backend(crate::summarizer::BackendError::Unavailable(format!(
                    "Failed to spawn summarization thread: {}",
                    e
                )))
            })?;

        match rx.recv_timeout(options.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                cancelled.store(true, Ordering::Relaxed);
                tracing::warn!(
                    backend = self.backend.name(),
                    "summarization exceeded {:?}",
                    options.timeout
                );
                Err(SummarizeError::Timeout {
                    seconds: options.timeout.as_secs(),
                })
            }
            Err(RecvTimeoutError::Disconnected) => Err(SummarizeError::Aborted),
        }
    }
}

/// Runs the requested products synchronously. BOTH issues two independent
/// backend invocations.
pub fn summarize_blocking(
    backend: &dyn SummarizationBackend,
    text: &str,
    mode: Mode,
    options: &SummaryOptions,
) -> Result<SummaryResult, SummarizeError> {
    run_products(backend, text, mode, options, &AtomicBool::new(false))
}

/// Stops with `Aborted` before any backend call once `cancelled` is set.
fn run_products(
    backend: &dyn SummarizationBackend,
    text: &str,
    mode: Mode,
    options: &SummaryOptions,
    cancelled: &AtomicBool,
) -> Result<SummaryResult, SummarizeError> {
    let _span = tracing::info_span!(
        "summarizer.summarize",
        backend = backend.name(),
        mode = %mode,
        chars = text.chars().count()
    )
    .entered();

    let mut result = SummaryResult::default();

    if mode.wants_short() {
        let summary = generate_bounded(
            backend,
            text,
            SummaryStyle::Short,
            options.short_max_tokens,
            options.short_min_tokens,
            cancelled,
        )?;
        let summary = clip_tokens(&summary, options.short_max_tokens);
        if summary.is_empty() {
            return Err(SummarizeError::EmptyOutput("short"));
        }
        result.short_summary = Some(summary);
    }

    if mode.wants_detailed() {
        let notes = generate_bounded(
            backend,
            text,
            SummaryStyle::Detailed,
            options.detailed_max_tokens,
            options.detailed_min_tokens,
            cancelled,
        )?;
        let notes = to_bullets(&clip_tokens(&notes, options.detailed_max_tokens));
        if notes.is_empty() {
            return Err(SummarizeError::EmptyOutput("detailed"));
        }
        result.detailed_notes = Some(notes);
    }

    Ok(result)
}

/// Generates one product, reducing oversized input hierarchically: segments
/// are summarized individually, their summaries joined and summarized again,
/// until the text fits a single backend call.
fn generate_bounded(
    backend: &dyn SummarizationBackend,
    text: &str,
    style: SummaryStyle,
    max_tokens: usize,
    min_tokens: usize,
    cancelled: &AtomicBool,
) -> Result<String, SummarizeError> {
    let generate = |text: &str| -> Result<String, SummarizeError> {
        if cancelled.load(Ordering::Relaxed) {
            return Err(SummarizeError::Aborted);
        }
        Ok(backend.generate(&GenerationRequest {
            text,
            style,
            max_tokens,
            min_tokens,
        })?)
    };

    let limit = backend.max_input_chars().max(MIN_SEGMENT_CHARS);
    let mut current = text.trim().to_string();

    for depth in 0..MAX_REDUCTION_DEPTH {
        let chars = current.chars().count();
        if chars <= limit {
            break;
        }

        let segments = split_segments(&current, limit);
        tracing::debug!(depth, segments = segments.len(), chars, "reducing oversized input");

        let mut partials = Vec::with_capacity(segments.len());
        for segment in &segments {
            let partial = generate(segment.as_str())?;
            let partial = partial.trim();
            if !partial.is_empty() {
                partials.push(partial.to_string());
            }
        }

        let next = partials.join(" ");
        if next.chars().count() >= chars {
            // No progress; fall through to truncation.
            current = crate::extractor::truncate_chars(&next, limit);
            break;
        }
        current = next;
    }

    if current.chars().count() > limit {
        current = crate::extractor::truncate_chars(&current, limit);
    }

    let output = generate(current.as_str())?;

    Ok(output.trim().to_string())
}
