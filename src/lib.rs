//! # ielts-extract
//!
//! Read candidate details and band scores from scanned IELTS Test Report
//! Form (TRF) PDFs with a vision language model, and collect them in an
//! Excel workbook.
//!
//! ## Pipeline
//!
//! ```text
//! PDF (path, URL or uploaded bytes)
//!  │
//!  ├─ 1. Input   resolve to a local file, check %PDF magic
//!  ├─ 2. Render  page one via pdfium at 300 DPI (spawn_blocking)
//!  ├─ 3. Encode  PNG → base64 ImageData
//!  ├─ 4. VLM     one request: fixed prompt + image (gpt-4o, temperature 0)
//!  ├─ 5. Parse   comma-split reply, padded/truncated to nine fields
//!  └─ 6. Export  one row per report → IELTS Results.xlsx
//! ```
//!
//! Reports are processed one after another. There is no local OCR and no
//! retry: a failed report is recorded and left out of the workbook.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ielts_extract::{extract_to_file, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = ExtractionConfig::default();
//!     let out = extract_to_file(&["amina.pdf", "jonas.pdf"], "IELTS Results.xlsx", &config).await?;
//!     for report in &out.reports {
//!         println!("{}: {:?}", report.source, report.fields.overall);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ielts-extract` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, DEFAULT_MODEL, DEFAULT_OUTPUT_FILE};
pub use export::{render_table, write_xlsx, xlsx_bytes};
pub use extract::{extract_batch, extract_from_bytes, extract_report, extract_sync, extract_to_file};
pub use error::{ExtractError, ReportError};
pub use output::{BatchOutput, BatchStats, ReportFields, ReportResult};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use prompts::{COLUMNS, EXTRACTION_PROMPT, FIELD_COUNT};
