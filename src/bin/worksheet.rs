//! CLI binary for worksheet-wizard.
//!
//! A thin shim over the library crate that maps CLI flags to `WizardConfig`
//! and walks one wizard session: pick → upload → generate → download.

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use worksheet_wizard::messages::PROGRESS_STEPS;
use worksheet_wizard::pipeline::markup;
use worksheet_wizard::pipeline::select::read_candidate;
use worksheet_wizard::{
    ActionOutcome, Notification, NotificationKind, ViewKind, Wizard, WizardConfig,
    WizardObserver,
};

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── Terminal observer using indicatif ────────────────────────────────────────

/// Prints notifications above a spinner whose prefix follows the wizard step.
struct CliObserver {
    bar: ProgressBar,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix(PROGRESS_STEPS[0]);
        bar.set_message("Reading file…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl WizardObserver for CliObserver {
    fn on_notification(&self, notification: &Notification) {
        let line = match notification.kind {
            NotificationKind::Success => format!("{} {}", green("✓"), notification.text),
            NotificationKind::Error => format!("{} {}", red("✗"), red(&notification.text)),
        };
        self.bar.println(line);
    }

    fn on_view_change(&self, view: ViewKind) {
        let (step, msg) = match view {
            ViewKind::SelectingEmpty => (0, "No file selected"),
            ViewKind::SelectingWithFile => (0, "File selected"),
            ViewKind::Uploading => (0, "Uploading…"),
            ViewKind::AwaitingGeneration => (1, "Generating worksheet…"),
            ViewKind::Generated => (2, "Compiling PDF…"),
        };
        self.bar.set_prefix(PROGRESS_STEPS[step]);
        self.bar.set_message(msg);
    }
}

/// Prints notifications as plain coloured lines on stderr.
struct PlainObserver;

impl WizardObserver for PlainObserver {
    fn on_notification(&self, notification: &Notification) {
        match notification.kind {
            NotificationKind::Success => eprintln!("{} {}", green("✓"), notification.text),
            NotificationKind::Error => eprintln!("{} {}", red("✗"), red(&notification.text)),
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Photo of a worksheet → PDF next to it
  worksheet scan.jpg

  # Choose the output path and keep the generated LaTeX
  worksheet scan.png -o out/sheet.pdf --latex-out out/sheet.tex

  # Talk to a remote backend
  worksheet --base-url https://worksheets.example.org scan.pdf

  # Only check that the backend is up
  worksheet --check

  # Machine-readable summary
  worksheet --json scan.jpg > summary.json

SUPPORTED INPUT:
  .jpg / .jpeg   image/jpeg
  .png           image/png
  .pdf           application/pdf

ENVIRONMENT VARIABLES:
  WORKSHEET_API_URL       Backend base URL (default http://localhost:8000)
  WORKSHEET_OUTPUT        Output PDF path
  WORKSHEET_TIMEOUT       Per-request timeout in seconds
  RUST_LOG                Log filter, e.g. worksheet_wizard=debug
"#;

/// Turn a worksheet photo or PDF into a compiled LaTeX worksheet.
#[derive(Parser, Debug)]
#[command(
    name = "worksheet",
    version,
    about = "Turn a worksheet photo or PDF into a compiled LaTeX worksheet",
    long_about = "Uploads one worksheet (JPG, PNG or PDF) to the worksheet backend, has it \
generate LaTeX for the exercises, compiles the LaTeX and downloads the resulting PDF.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Worksheet file (.jpg, .jpeg, .png or .pdf).
    #[arg(required_unless_present = "check")]
    input: Option<PathBuf>,

    /// Backend base URL.
    #[arg(long, env = "WORKSHEET_API_URL", default_value = worksheet_wizard::config::DEFAULT_BASE_URL)]
    base_url: String,

    /// Write the PDF here. Default: input path with a `.worksheet.pdf` suffix.
    #[arg(short, long, env = "WORKSHEET_OUTPUT")]
    output: Option<PathBuf>,

    /// Also write the generated LaTeX to this file.
    #[arg(long, env = "WORKSHEET_LATEX_OUT")]
    latex_out: Option<PathBuf>,

    /// Per-request timeout in seconds.
    #[arg(long, env = "WORKSHEET_TIMEOUT", default_value_t = 180,
          value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// Connect timeout in seconds.
    #[arg(long, env = "WORKSHEET_CONNECT_TIMEOUT", default_value_t = 10,
          value_parser = clap::value_parser!(u64).range(1..))]
    connect_timeout: u64,

    /// How long notifications stay visible, in milliseconds.
    #[arg(long, env = "WORKSHEET_NOTIFICATION_MS", default_value_t = 3500,
          value_parser = clap::value_parser!(u64).range(1..))]
    notification_ms: u64,

    /// Strip Markdown code fences from the generated LaTeX before compiling.
    #[arg(long, env = "WORKSHEET_CLEAN_MARKUP")]
    clean_markup: bool,

    /// Only check that the backend is reachable.
    #[arg(long)]
    check: bool,

    /// Print a JSON summary on stdout.
    #[arg(long, env = "WORKSHEET_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "WORKSHEET_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "WORKSHEET_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "WORKSHEET_QUIET")]
    quiet: bool,
}

/// Printed with `--json`.
#[derive(Debug, Serialize)]
struct RunSummary {
    input: PathBuf,
    session_id: String,
    output: PathBuf,
    pdf_bytes: u64,
    latex_out: Option<PathBuf>,
    markup: markup::MarkupSummary,
    duration_ms: u128,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Keep library INFO logs out of the way while the spinner is drawing.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let cli_observer = show_progress.then(CliObserver::new);
    let config = build_config(&cli, cli_observer.clone())?;
    let wizard = Wizard::new(config).context("Failed to set up the wizard")?;

    // ── Health check mode ────────────────────────────────────────────────
    if cli.check {
        let health = wizard
            .health()
            .await
            .with_context(|| format!("Backend at {} is not reachable", cli.base_url))?;
        if let Some(obs) = &cli_observer {
            obs.finish();
        }
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&health).context("Failed to serialise health status")?
            );
        } else if !cli.quiet {
            eprintln!(
                "{} {} {}",
                if health.is_ok() { green("✔") } else { red("✘") },
                bold(&cli.base_url),
                dim(&health.status),
            );
        }
        if !health.is_ok() {
            bail!("Backend reported status '{}'", health.status);
        }
        return Ok(());
    }

    let Some(input) = cli.input.clone() else {
        bail!("No input file given");
    };
    let result = run(&cli, &wizard, &input).await;
    if let Some(obs) = &cli_observer {
        obs.finish();
    }
    let summary = result?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{}  {} exercises  {}ms  →  {}",
            green("✔"),
            summary.markup.items,
            summary.duration_ms,
            bold(&summary.output.display().to_string()),
        );
        eprintln!(
            "   {} bytes of PDF  /  {} lines of LaTeX  /  session {}",
            dim(&summary.pdf_bytes.to_string()),
            dim(&summary.markup.lines.to_string()),
            cyan(&summary.session_id),
        );
    }

    Ok(())
}

/// Drive one session through all steps.
async fn run(cli: &Cli, wizard: &Wizard, input: &Path) -> Result<RunSummary> {
    let started = Instant::now();

    // Read once with typed errors so missing files and permission problems
    // get a precise message.
    let file = read_candidate(input).with_context(|| format!("Cannot use {}", input.display()))?;
    wizard.select_file(Some(file), Vec::new());

    expect_completed(wizard.upload_file().await).context("Upload failed")?;
    let session_id = wizard.session().context("Upload returned no session")?;

    expect_completed(wizard.generate_latex().await).context("Worksheet generation failed")?;
    let latex = wizard.markup().context("Generation returned no markup")?;

    if let Some(path) = &cli.latex_out {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::write(path, &latex)
            .await
            .with_context(|| format!("Failed to write LaTeX to {}", path.display()))?;
    }

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| input.with_extension("worksheet.pdf"));
    let pdf_bytes = wizard
        .download_pdf(&output)
        .await
        .with_context(|| format!("Failed to download PDF to {}", output.display()))?;

    Ok(RunSummary {
        input: input.to_path_buf(),
        session_id,
        output,
        pdf_bytes,
        latex_out: cli.latex_out.clone(),
        markup: markup::summarize(&latex),
        duration_ms: started.elapsed().as_millis(),
    })
}

fn expect_completed(outcome: ActionOutcome) -> Result<()> {
    match outcome {
        ActionOutcome::Completed => Ok(()),
        ActionOutcome::Failed(e) => Err(e.into()),
        ActionOutcome::Skipped => bail!("Step skipped: the wizard was not ready for it"),
        ActionOutcome::Discarded => bail!("Step discarded after a reset"),
    }
}

/// Map CLI args to `WizardConfig`.
fn build_config(cli: &Cli, observer: Option<Arc<CliObserver>>) -> Result<WizardConfig> {
    let mut builder = WizardConfig::builder()
        .base_url(&cli.base_url)
        .request_timeout_secs(cli.timeout)
        .connect_timeout_secs(cli.connect_timeout)
        .notification_ttl(Duration::from_millis(cli.notification_ms))
        .clean_markup(cli.clean_markup);

    builder = match observer {
        Some(obs) => builder.observer(obs as Arc<dyn WizardObserver>),
        None if !cli.quiet && !cli.json => builder.observer(Arc::new(PlainObserver)),
        None => builder,
    };

    builder.build().context("Invalid configuration")
}
