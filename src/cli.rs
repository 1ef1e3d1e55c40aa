use crate::engine::archive::archive_file_name;
use crate::engine::fetch::HttpFetcher;
use crate::engine::Pipeline;
use crate::feedback::FeedbackInput;
use crate::model::{ExportConfig, ExportEvent, ExportReport};
use crate::orchestrator::{Exporter, RequestTracker};
use crate::state::{ExportSource, SharedState};
use crate::storage::{self, DiskSaver};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "submission-export",
    version,
    about = "Bundle a graded submission's attachments into a zip archive"
)]
pub struct Cli {
    /// Submission response JSON file (`{"files": [...]}`)
    #[arg(long)]
    pub response: PathBuf,

    /// Username of the submission's learner, used in the archive name
    #[arg(long)]
    pub username: String,

    /// Directory the archive is saved into (defaults to the user's download dir)
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Base URL used to resolve relative download URLs
    #[arg(long)]
    pub base_url: Option<String>,

    /// Per-request HTTP timeout
    #[arg(long, default_value = "30s")]
    pub timeout: humantime::Duration,

    /// Overall feedback to record for this submission
    #[arg(long)]
    pub feedback: Option<String>,

    /// Print JSON report and exit
    #[arg(long)]
    pub json: bool,

    /// Run silently: suppress all output except errors
    #[arg(long)]
    pub silent: bool,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long, short)]
    pub verbose: bool,
}

/// Build an `ExportConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> ExportConfig {
    ExportConfig {
        base_url: args.base_url.clone(),
        out_dir: args
            .out_dir
            .clone()
            .unwrap_or_else(storage::default_output_dir),
        timeout: Duration::from(args.timeout),
        user_agent: format!("submission-export/{}", env!("CARGO_PKG_VERSION")),
    }
}

/// Load the response into shared state and apply any feedback through the input control.
fn build_state(args: &Cli) -> Result<SharedState> {
    let response = storage::load_response(&args.response)?;
    let state = SharedState::default();
    state.load_submission(response, args.username.clone());

    if let Some(text) = args.feedback.as_deref() {
        state.start_grading();
        FeedbackInput::new(state.clone()).on_value_changed(text);
    }
    Ok(state)
}

pub async fn run(args: Cli) -> Result<()> {
    if args.silent && args.json {
        return Err(anyhow::anyhow!(
            "--silent and --json are mutually exclusive."
        ));
    }

    let cfg = build_config(&args);
    tracing::debug!(config = %serde_json::to_string(&cfg)?, "export config");
    let state = build_state(&args)?;
    let text_mode = !args.json && !args.silent;

    let (out_tx, out_handle) = if args.silent {
        (None, None)
    } else {
        let (tx, handle) = spawn_output_writer();
        (Some(tx), Some(handle))
    };

    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<ExportEvent>();
    let fetcher = HttpFetcher::new(&cfg, Some(evt_tx.clone()))?;
    let saver = DiskSaver::new(&cfg.out_dir, Some(evt_tx.clone()));
    let archive_path = saver.target_path(&archive_file_name(&state.current_username()));
    let pipeline = Pipeline::new(fetcher, saver, Some(evt_tx.clone()));
    let exporter = Exporter::new(pipeline, state.clone(), RequestTracker::new(Some(evt_tx)));

    let request = exporter.download_files();
    // The running request holds the remaining senders; the loop ends when it finishes.
    drop(exporter);

    let mut total_bytes = 0u64;
    while let Some(ev) = evt_rx.recv().await {
        if let ExportEvent::FileFetched { bytes, .. } = &ev {
            total_bytes += bytes;
        }
        if !text_mode {
            continue;
        }
        let msg = match ev {
            ExportEvent::RequestStarted { key } => format!("== {key} =="),
            ExportEvent::FileFetched { name, bytes } => format!("Fetched {name} ({bytes} bytes)"),
            ExportEvent::ArchiveSaved { path, .. } => format!("Saved: {}", path.display()),
            ExportEvent::RequestCompleted { key } => format!("{key} completed"),
            ExportEvent::RequestFailed { key, message } => format!("{key} failed: {message}"),
            ExportEvent::Info(info) => info.to_message(),
        };
        if let Some(tx) = out_tx.as_ref() {
            let _ = tx.send(OutputLine::Stderr(msg));
        }
    }

    let outcome = request.wait().await.context("export failed");

    if outcome.is_ok() {
        let snapshot = state.snapshot();
        let report = ExportReport {
            exported_at_utc: time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_else(|_| "now".into()),
            username: snapshot.username,
            archive_path,
            file_count: snapshot.response.files.len(),
            total_bytes,
            overall_feedback: Some(snapshot.overall_feedback).filter(|f| !f.is_empty()),
        };

        if let Some(tx) = out_tx.as_ref() {
            if args.json {
                let out = serde_json::to_string_pretty(&report)?;
                let _ = tx.send(OutputLine::Stdout(out));
            } else {
                for line in crate::text_summary::build_text_summary(&report).lines {
                    let _ = tx.send(OutputLine::Stdout(line));
                }
            }
        }
    }

    if let Some(tx) = out_tx {
        drop(tx);
    }
    if let Some(handle) = out_handle {
        let _ = handle.await;
    }

    outcome
}
