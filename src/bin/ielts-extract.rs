//! CLI binary for ielts-extract.
//!
//! A thin shim over the library: maps flags to `ExtractionConfig`, shows
//! progress, prints the results table and writes the workbook.

use anyhow::{Context, Result};
use clap::Parser;
use ielts_extract::{
    extract_batch, render_table, write_xlsx, ExtractionConfig, ExtractionProgressCallback,
    ProgressCallback, ReportFields, DEFAULT_MODEL, DEFAULT_OUTPUT_FILE,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── Progress callback ────────────────────────────────────────────────────────

/// One bar over the batch, with a log line per report and the raw model
/// output underneath it.
struct CliProgressCallback {
    bar: ProgressBar,
    show_replies: bool,
}

impl CliProgressCallback {
    fn new(show_replies: bool) -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:36.green/238}] {pos}/{len} reports  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        bar.set_style(style);
        bar.set_prefix("Extracting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar, show_replies })
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_reports: usize) {
        self.bar.set_length(total_reports as u64);
        self.bar.reset_eta();
    }

    fn on_report_start(&self, index: usize, total: usize, source: &str) {
        self.bar.set_message(source.to_string());
        self.bar.println(format!(
            "{} Processing {}/{}: {}",
            cyan("◆"),
            index,
            total,
            bold(source)
        ));
    }

    fn on_model_reply(&self, _index: usize, reply: &str) {
        if self.show_replies {
            self.bar.println(format!("    {} {}", dim("model output:"), reply));
        }
    }

    fn on_report_complete(&self, _index: usize, _total: usize, fields: &ReportFields) {
        self.bar.println(format!(
            "  {} {} {}  overall {}",
            green("✓"),
            fields.first_name,
            fields.family_name,
            if fields.overall.is_empty() { "—" } else { &fields.overall }
        ));
        self.bar.inc(1);
    }

    fn on_report_error(&self, _index: usize, _total: usize, error: &str) {
        let msg = match error.char_indices().nth(100) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error.to_string(),
        };
        self.bar.println(format!("  {} {}", red("✗"), red(&msg)));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_reports: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = total_reports.saturating_sub(success_count);
        if failed == 0 {
            eprintln!(
                "{} {} report(s) extracted",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} report(s) extracted  ({} failed)",
                if failed == total_reports { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total_reports,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract two reports into "IELTS Results.xlsx"
  ielts-extract amina_trf.pdf jonas_trf.pdf

  # Every PDF in a folder, custom output path
  ielts-extract scans/*.pdf -o results/cohort-2026.xlsx

  # Use another vision model
  ielts-extract --provider anthropic --model claude-sonnet-4-20250514 trf.pdf

  # JSON on stdout (raw replies, tokens, per-report errors)
  ielts-extract --json trf.pdf > trf.json

  # Fail without writing anything if any report fails
  ielts-extract --strict scans/*.pdf

COLUMNS:
  First Name, Family Name, Date of Examination, Listening Score,
  Reading Score, Writing Score, Speaking Score, Overall Band Score, CEFR Level

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Provider used when --provider is not given
  EDGEQUAKE_MODEL         Model paired with EDGEQUAKE_LLM_PROVIDER
  PDFIUM_LIB_PATH         Path to an existing libpdfium; skips the download
  PDFIUM_AUTO_CACHE_DIR   Override the pdfium cache directory
  RUST_LOG                Log filter (e.g. ielts_extract=debug)
"#;

/// Extract IELTS Test Report Form details into an Excel workbook.
#[derive(Parser, Debug)]
#[command(
    name = "ielts-extract",
    version,
    about = "Extract IELTS Test Report Form details into an Excel workbook",
    long_about = "Renders page one of each IELTS Test Report Form PDF, asks a vision LLM for the \
candidate's name, exam date, four band scores, overall score and CEFR level, and writes one row \
per report to an .xlsx workbook.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Report PDFs: local paths or HTTP/HTTPS URLs, processed in order.
    #[arg(required = true, num_args = 1..)]
    inputs: Vec<String>,

    /// Workbook to write.
    #[arg(short, long, env = "IELTS_OUTPUT", default_value = DEFAULT_OUTPUT_FILE)]
    output: PathBuf,

    /// Vision model ID.
    #[arg(long, env = "IELTS_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// LLM provider: openai, anthropic, gemini, azure, ollama. Auto-detected if unset.
    #[arg(long, env = "IELTS_PROVIDER")]
    provider: Option<String>,

    /// Rendering DPI for page one (72–400).
    #[arg(long, env = "IELTS_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// PDF user password for encrypted reports.
    #[arg(long, env = "IELTS_PASSWORD")]
    password: Option<String>,

    /// Text file with a prompt that replaces the built-in one.
    #[arg(long, env = "IELTS_PROMPT_FILE")]
    prompt_file: Option<PathBuf>,

    /// Max tokens in the model reply.
    #[arg(long, env = "IELTS_MAX_TOKENS", default_value_t = 300)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "IELTS_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// Model call timeout in seconds.
    #[arg(long, env = "IELTS_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, env = "IELTS_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Worksheet name.
    #[arg(long, env = "IELTS_SHEET", default_value = "Sheet1")]
    sheet: String,

    /// Print the batch as JSON on stdout instead of the table.
    #[arg(long, env = "IELTS_JSON")]
    json: bool,

    /// Do not print the results table.
    #[arg(long, env = "IELTS_NO_TABLE")]
    no_table: bool,

    /// Exit with an error, writing nothing, if any report fails.
    #[arg(long, env = "IELTS_STRICT")]
    strict: bool,

    /// Disable the progress bar.
    #[arg(long, env = "IELTS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "IELTS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "IELTS_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar already reports each file, so library INFO logs are
    // hidden while it is active.
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

    ensure_pdfium(cli.quiet)?;

    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new(!cli.quiet) as ProgressCallback)
    } else {
        None
    };
    let config = build_config(&cli, progress).await?;

    // ── Run extraction ───────────────────────────────────────────────────
    let mut output = extract_batch(&cli.inputs, &config)
        .await
        .context("Extraction failed")?;

    if cli.strict {
        output = output.into_result().context("Strict mode")?;
    }

    let rows = output.rows();
    write_xlsx(&cli.output, &config.sheet_name, &rows)
        .with_context(|| format!("Failed to write {}", cli.output.display()))?;

    // ── Report ───────────────────────────────────────────────────────────
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        writeln!(handle, "{json}").context("Failed to write to stdout")?;
    } else if !cli.no_table && !cli.quiet {
        handle
            .write_all(render_table(&rows).as_bytes())
            .context("Failed to write to stdout")?;
    }

    if !cli.quiet {
        if !show_progress {
            for r in output.reports.iter().filter(|r| r.is_ok()) {
                eprintln!("{}: model output: {}", r.source, r.raw_reply);
            }
            for e in output.reports.iter().filter_map(|r| r.error.as_ref()) {
                eprintln!("{} {}", red("✗"), e);
            }
        }
        let stats = &output.stats;
        eprintln!(
            "{}  {}/{} reports  {}ms  →  {}",
            if stats.failed_reports == 0 { green("✔") } else { cyan("⚠") },
            stats.extracted_reports,
            stats.total_reports,
            stats.total_duration_ms,
            bold(&cli.output.display().to_string()),
        );
        eprintln!(
            "   {} tokens in  /  {} tokens out",
            dim(&stats.total_input_tokens.to_string()),
            dim(&stats.total_output_tokens.to_string()),
        );
    }

    Ok(())
}

/// Make sure a pdfium library is present before the first render, showing a
/// download bar on the very first run.
fn ensure_pdfium(quiet: bool) -> Result<()> {
    if pdfium_auto::is_available() {
        return Ok(());
    }

    if quiet {
        tokio::task::block_in_place(|| pdfium_auto::ensure_library(None))
            .context("Failed to download PDFium engine")?;
        return Ok(());
    }

    let dl_bar = ProgressBar::new(0);
    dl_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:36.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS),
    );
    dl_bar.set_prefix("PDF engine");
    dl_bar.enable_steady_tick(Duration::from_millis(80));

    let bar = dl_bar.clone();
    tokio::task::block_in_place(|| {
        pdfium_auto::ensure_library(Some(&|downloaded, total| {
            if let Some(t) = total {
                bar.set_length(t);
            }
            bar.set_position(downloaded);
        }))
    })
    .context("Failed to download PDFium engine")?;

    dl_bar.finish_with_message("ready ✓");
    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .dpi(cli.dpi)
        .model(&cli.model)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout)
        .sheet_name(&cli.sheet);

    if let Some(ref name) = cli.provider {
        builder = builder.provider_name(name);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(ref path) = cli.prompt_file {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {path:?}"))?;
        builder = builder.prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
