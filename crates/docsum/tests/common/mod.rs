//! Shared test utilities for docsum integration tests.
//!
//! This module provides:
//! - `TestHarness` wiring an orchestrator to an isolated store
//! - Fixture builders (PDF, DOCX, text) and scripted summarization backends

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
