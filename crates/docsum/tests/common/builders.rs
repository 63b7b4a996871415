//! Fixture builders and scripted backends for integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use lopdf::{dictionary, Document, Object, Stream};

use docsum::pipeline::PipelineSettings;
use docsum::summarizer::{BackendError, GenerationRequest, SummarizationBackend};

// ─── Documents ──────────────────────────────────────────────────────────────

/// Builds a PDF with one page per entry; `None` pages have no content stream.
pub fn build_pdf(pages: &[Option<&str>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for page in pages {
        let mut page_dict = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => resources_id,
        };
        if let Some(text) = page {
            let content = format!("BT /F1 11 Tf 72 720 Td ({}) Tj ET", text);
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            page_dict.set("Contents", content_id);
        }
        kids.push(doc.add_object(page_dict).into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("Failed to serialize PDF");
    bytes
}

/// Builds a minimal DOCX whose body holds one paragraph per entry.
pub fn build_docx(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect();
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
        body
    );

    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buffer);
        let options = zip::write::SimpleFileOptions::default();
        writer
            .start_file("word/document.xml", options)
            .expect("Failed to start zip entry");
        writer
            .write_all(xml.as_bytes())
            .expect("Failed to write zip entry");
        writer.finish().expect("Failed to finish zip");
    }
    buffer.into_inner()
}

const SENTENCES: &[&str] = &[
    "The committee reviewed the annual budget in detail.",
    "Transport costs rose sharply during the winter months.",
    "Several departments reported savings from shared services.",
    "A new procurement policy will take effect next quarter.",
    "Staff training remains a priority for the coming year.",
    "The audit found no material weaknesses in the controls.",
    "Energy use fell after the building upgrades were finished.",
    "Members asked for clearer reporting on capital projects.",
];

/// Prose of at least `min_chars` characters, built from whole sentences.
pub fn prose(min_chars: usize) -> String {
    let mut text = String::new();
    let mut i = 0;
    while text.chars().count() < min_chars {
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(SENTENCES[i % SENTENCES.len()]);
        i += 1;
    }
    text
}

/// Prose of exactly `chars` characters.
pub fn prose_exact(chars: usize) -> String {
    prose(chars).chars().take(chars).collect()
}

// ─── Settings ───────────────────────────────────────────────────────────────

/// Builder for pipeline settings used in tests.
pub struct SettingsBuilder {
    settings: PipelineSettings,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Self {
            settings: PipelineSettings::default(),
        }
    }

    pub fn sync_threshold(mut self, chars: usize) -> Self {
        self.settings.sync_size_threshold_chars = chars;
        self
    }

    pub fn max_document_size(mut self, bytes: u64) -> Self {
        self.settings.max_document_size_bytes = bytes;
        self
    }

    pub fn short_max_tokens(mut self, tokens: usize) -> Self {
        self.settings.short_max_tokens = tokens;
        self
    }

    pub fn detailed_max_tokens(mut self, tokens: usize) -> Self {
        self.settings.detailed_max_tokens = tokens;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.settings.summarization_timeout = timeout;
        self
    }

    pub fn build(self) -> PipelineSettings {
        self.settings
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Backends ───────────────────────────────────────────────────────────────

/// Echoes the first words of its input and records every request.
#[derive(Default)]
pub struct EchoBackend {
    pub requests: Mutex<Vec<(String, usize)>>,
    calls: AtomicUsize,
}

impl EchoBackend {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `max_tokens` of every request, in call order.
    pub fn max_tokens_seen(&self) -> Vec<usize> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, max)| *max)
            .collect()
    }
}

impl SummarizationBackend for EchoBackend {
    fn name(&self) -> &str {
        "echo"
    }

    fn max_input_chars(&self) -> usize {
        1_000_000
    }

    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push((
            request.style.as_str().to_string(),
            request.max_tokens,
        ));
        Ok(request
            .text
            .split_whitespace()
            .take(request.max_tokens)
            .collect::<Vec<_>>()
            .join(" "))
    }
}

/// Fails the first `failures` calls, then echoes.
pub struct FlakyBackend {
    remaining_failures: AtomicUsize,
}

impl FlakyBackend {
    pub fn new(failures: usize) -> Self {
        Self {
            remaining_failures: AtomicUsize::new(failures),
        }
    }
}

impl SummarizationBackend for FlakyBackend {
    fn name(&self) -> &str {
        "flaky"
    }

    fn max_input_chars(&self) -> usize {
        1_000_000
    }

    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, BackendError> {
        let failed = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(BackendError::Inference("model crashed".to_string()));
        }
        Ok(request
            .text
            .split_whitespace()
            .take(5)
            .collect::<Vec<_>>()
            .join(" "))
    }
}

/// Sleeps before answering.
pub struct SlowBackend {
    pub delay: Duration,
}

impl SummarizationBackend for SlowBackend {
    fn name(&self) -> &str {
        "slow"
    }

    fn max_input_chars(&self) -> usize {
        1_000_000
    }

    fn generate(&self, _request: &GenerationRequest<'_>) -> Result<String, BackendError> {
        std::thread::sleep(self.delay);
        Ok("late answer".to_string())
    }
}

/// Blocks every call until the test opens the gate.
pub struct GateBackend {
    started_tx: Sender<()>,
    release_rx: Receiver<()>,
}

/// Test-side handles of a [`GateBackend`].
pub struct Gate {
    pub started: Receiver<()>,
    release: Sender<()>,
}

impl Gate {
    /// Lets `n` blocked calls proceed.
    pub fn open(&self, n: usize) {
        for _ in 0..n {
            self.release.send(()).expect("gate backend dropped");
        }
    }

    /// Waits until a call has reached the backend.
    pub fn wait_started(&self) {
        self.started
            .recv_timeout(Duration::from_secs(10))
            .expect("backend was never called");
    }
}

pub fn gate_backend() -> (GateBackend, Gate) {
    let (started_tx, started) = crossbeam_channel::unbounded();
    let (release, release_rx) = crossbeam_channel::unbounded();
    (
        GateBackend {
            started_tx,
            release_rx,
        },
        Gate { started, release },
    )
}

impl SummarizationBackend for GateBackend {
    fn name(&self) -> &str {
        "gate"
    }

    fn max_input_chars(&self) -> usize {
        1_000_000
    }

    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, BackendError> {
        let _ = self.started_tx.send(());
        self.release_rx
            .recv()
            .map_err(|_| BackendError::Unavailable("gate closed".to_string()))?;
        Ok(request
            .text
            .split_whitespace()
            .take(request.max_tokens)
            .collect::<Vec<_>>()
            .join(" "))
    }
}
