//! Tracing subscriber setup for the binary.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::DocsumError;

const DEFAULT_FILTER: &str = "info";

/// Installs the global subscriber and routes `log` records into it.
///
/// - Respects `RUST_LOG` for filtering (defaults to `info`).
/// - Writes to stderr, as compact text or one JSON object per line.
pub fn init_tracing(json: bool) -> Result<(), DocsumError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if json {
        let layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr);
        tracing::subscriber::set_global_default(registry.with(layer))
    } else {
        let layer = fmt::layer()
            .with_target(false)
            .compact()
            .with_writer(std::io::stderr);
        tracing::subscriber::set_global_default(registry.with(layer))
    };
    installed.map_err(|e| DocsumError::Telemetry(e.to_string()))?;

    tracing_log::LogTracer::init().map_err(|e| DocsumError::Telemetry(e.to_string()))?;

    Ok(())
}
