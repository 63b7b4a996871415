use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;

use docsum::config::load_with_env;
use docsum::error::{ConfigError, DocsumError, PipelineError};
use docsum::pipeline::{Orchestrator, PipelineSettings, StatusView};
use docsum::store::SubmissionFilter;
use docsum::submission::{Format, Mode, OwnerId, SubmissionId, SubmissionStatus};
use docsum::summarizer::{build_backend, SummarizationEngine};
use docsum::extractor::ExtractorRegistry;
use docsum::telemetry;

#[derive(Parser)]
#[command(
    name = "docsum",
    version,
    about = "Extract text from documents and summarize it"
)]
struct Cli {
    /// Path to a docsum.json configuration file.
    #[arg(long, short, global = true, env = "DOCSUM_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    json_logs: bool,

    /// Owner identifier used to scope submissions.
    #[arg(long, global = true, env = "DOCSUM_OWNER", default_value = "local")]
    owner: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a document or raw text for summarization.
    Submit {
        /// PDF, DOCX or TXT file.
        #[arg(conflicts_with = "text", required_unless_present = "text")]
        file: Option<PathBuf>,
        /// Raw text to summarize instead of a file.
        #[arg(long)]
        text: Option<String>,
        #[arg(long, default_value = "both")]
        mode: Mode,
        /// Seconds to wait before printing the current status. Queued work
        /// still finishes before the process exits.
        #[arg(long, default_value_t = 600)]
        timeout: u64,
    },
    /// Show the status and result of a submission.
    Status { id: String },
    /// Re-run a failed submission.
    Retry {
        id: String,
        #[arg(long, default_value_t = 600)]
        timeout: u64,
    },
    /// List submissions, newest first.
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: u64,
        #[arg(long, default_value_t = 0)]
        offset: u64,
    },
    /// Summarize without storing anything.
    Summarize {
        #[arg(conflicts_with = "text", required_unless_present = "text")]
        file: Option<PathBuf>,
        #[arg(long)]
        text: Option<String>,
        #[arg(long, default_value = "both")]
        mode: Mode,
    },
    /// Print the effective configuration.
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = telemetry::init_tracing(cli.json_logs) {
        eprintln!("warning: {}", e);
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), DocsumError> {
    let config = load_with_env(cli.config.as_deref())?;
    let owner = OwnerId::new(cli.owner);

    match cli.command {
        Command::Config => print_json(&config),
        Command::Summarize { file, text, mode } => {
            let settings = PipelineSettings::from_config(&config);
            let (bytes, format) = match (file, text) {
                (Some(path), _) => (std::fs::read(&path)?, format_for(&path)?),
                (None, text) => (text.unwrap_or_default().into_bytes(), Format::Plain),
            };
            let text = ExtractorRegistry::new().extract(&bytes, format, &settings.extract_limits())?;
            let engine = SummarizationEngine::new(build_backend(&config.summarizer)?);
            let result = engine.summarize(&text, mode, &settings.summary_options())?;
            print_json(&result)
        }
        command => {
            let orchestrator = Orchestrator::from_config(&config)?;
            let outcome = run_stored(&orchestrator, &owner, command);
            orchestrator.shutdown();
            outcome
        }
    }
}

/// Commands that work on stored submissions. Queued jobs run on this
/// process's workers, so submit and retry wait for a terminal state, and
/// submissions a previous run left PROCESSING are picked up on startup.
fn run_stored(
    orchestrator: &Orchestrator,
    owner: &OwnerId,
    command: Command,
) -> Result<(), DocsumError> {
    match command {
        Command::Submit {
            file,
            text,
            mode,
            timeout,
        } => {
            let view = match (file, text) {
                (Some(path), _) => {
                    let filename = path
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default();
                    let bytes = std::fs::read(&path)?;
                    orchestrator.submit_upload(owner.clone(), &filename, bytes, mode)?
                }
                (None, text) => {
                    orchestrator.submit_text(owner.clone(), text.unwrap_or_default(), mode)?
                }
            };
            let view = if view.is_terminal() {
                view
            } else {
                orchestrator.wait_for_terminal(&view.id, Duration::from_secs(timeout))?
            };
            print_json(&view)
        }
        Command::Status { id } => {
            let view = orchestrator.status_for_owner(&SubmissionId::from(id), owner)?;
            print_json(&view)
        }
        Command::Retry { id, timeout } => {
            let id = SubmissionId::from(id);
            let view = orchestrator.retry_for_owner(&id, owner)?;
            let view = if view.is_terminal() {
                view
            } else {
                orchestrator.wait_for_terminal(&id, Duration::from_secs(timeout))?
            };
            print_json(&view)
        }
        Command::List {
            status,
            limit,
            offset,
        } => {
            let status = status
                .map(|s| {
                    SubmissionStatus::parse(&s).ok_or_else(|| {
                        DocsumError::Config(ConfigError::Validation {
                            message: format!("unknown status '{}'", s),
                        })
                    })
                })
                .transpose()?;
            let (page, total) = orchestrator.list(
                owner,
                SubmissionFilter {
                    status,
                    limit: Some(limit),
                    offset: Some(offset),
                    ..Default::default()
                },
            )?;
            print_json(&ListOutput {
                total,
                submissions: page,
            })
        }
        Command::Summarize { .. } | Command::Config => Ok(()),
    }
}

#[derive(Serialize)]
struct ListOutput {
    total: u64,
    submissions: Vec<StatusView>,
}

fn format_for(path: &Path) -> Result<Format, PipelineError> {
    let name = path.to_string_lossy();
    Format::from_filename(&name).ok_or_else(|| PipelineError::UnsupportedFormat(name.to_string()))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), DocsumError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
