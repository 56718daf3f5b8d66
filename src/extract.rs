//! Extraction entry points.
//!
//! [`extract_batch`] is the whole program in one call: a flat loop over the
//! inputs, one report at a time, each going render → encode → model →
//! parse. A report that fails is recorded and skipped; the batch itself only
//! fails when there was nothing to do or nothing succeeded.

use crate::config::ExtractionConfig;
use crate::error::{ExtractError, ReportError};
use crate::export;
use crate::output::{BatchOutput, BatchStats, ReportFields, ReportResult};
use crate::pipeline::{encode, input, llm, parse, render};
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Extract the fields of a single report from a path or URL.
///
/// Unlike [`extract_batch`], every failure is returned as `Err`. The input is
/// checked before a provider is resolved.
pub async fn extract_report(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ReportResult, ExtractError> {
    let input_str = input_str.as_ref();
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let provider = resolve_provider(config)?;
    let name = input::display_name(input_str);
    run_report(&provider, &name, resolved.path(), config, 1).await
}

/// Extract the fields of a report supplied as bytes (an upload).
///
/// The bytes are written to one temp file that is deleted on return.
///
/// ```rust,no_run
/// use ielts_extract::{extract_from_bytes, ExtractionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("trf.pdf")?;
/// let report = extract_from_bytes("trf.pdf", &bytes, &ExtractionConfig::default()).await?;
/// println!("{} scored {}", report.fields.first_name, report.fields.overall);
/// # Ok(())
/// # }
/// ```
pub async fn extract_from_bytes(
    name: &str,
    bytes: &[u8],
    config: &ExtractionConfig,
) -> Result<ReportResult, ExtractError> {
    let staged = input::from_bytes(name, bytes)?;
    let provider = resolve_provider(config)?;
    run_report(&provider, name, staged.path(), config, 1).await
}

/// Extract every input in order.
///
/// # Errors
/// - [`ExtractError::NoInputs`] for an empty input list
/// - [`ExtractError::ProviderNotConfigured`] when no model can be reached
/// - [`ExtractError::AllReportsFailed`] when no report produced a row
pub async fn extract_batch<S: AsRef<str>>(
    inputs: &[S],
    config: &ExtractionConfig,
) -> Result<BatchOutput, ExtractError> {
    if inputs.is_empty() {
        return Err(ExtractError::NoInputs);
    }

    let batch_start = Instant::now();
    let provider = resolve_provider(config)?;
    let total = inputs.len();
    info!("Extracting {} report(s) with {}", total, config.model);

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let mut reports = Vec::with_capacity(total);

    for (i, raw) in inputs.iter().enumerate() {
        let index = i + 1;
        let raw = raw.as_ref();
        let name = input::display_name(raw);
        info!("Processing: {}", name);

        if let Some(ref cb) = config.progress_callback {
            cb.on_report_start(index, total, &name);
        }

        let started = Instant::now();
        let outcome = async {
            let resolved = input::resolve_input(raw, config.download_timeout_secs).await?;
            run_report(&provider, &name, resolved.path(), config, index).await
        }
        .await;

        let result = match outcome {
            Ok(result) => {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_report_complete(index, total, &result.fields);
                }
                result
            }
            Err(e) => {
                let err = ReportError::from_extract(&name, &e);
                warn!("{}", err);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_report_error(index, total, &err.to_string());
                }
                ReportResult::failed(&name, err, started.elapsed().as_millis() as u64)
            }
        };

        reports.push(result);
    }

    let stats = summarise(&reports, batch_start.elapsed().as_millis() as u64);

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, stats.extracted_reports);
    }

    if stats.extracted_reports == 0 {
        let first_error = reports
            .iter()
            .find_map(|r| r.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(ExtractError::AllReportsFailed { total, first_error });
    }

    info!(
        "Batch complete: {}/{} reports in {}ms",
        stats.extracted_reports, total, stats.total_duration_ms
    );

    Ok(BatchOutput { reports, stats })
}

/// Extract every input and write the spreadsheet to `output_path`.
pub async fn extract_to_file<S: AsRef<str>>(
    inputs: &[S],
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<BatchOutput, ExtractError> {
    let output = extract_batch(inputs, config).await?;
    let rows = output.rows();
    let path = output_path.as_ref().to_path_buf();
    let sheet = config.sheet_name.clone();
    let xlsx = export::xlsx_bytes(&sheet, &rows)?;

    tokio::task::spawn_blocking(move || export::write_atomic(&path, &xlsx))
        .await
        .map_err(|e| ExtractError::Internal(format!("Write task panicked: {e}")))??;

    Ok(output)
}

/// Blocking wrapper around [`extract_batch`].
pub fn extract_sync<S: AsRef<str>>(
    inputs: &[S],
    config: &ExtractionConfig,
) -> Result<BatchOutput, ExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(extract_batch(inputs, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Render, ask and parse one resolved report. `index` is the 1-based batch
/// position reported to the progress callback.
async fn run_report(
    provider: &Arc<dyn LLMProvider>,
    name: &str,
    pdf_path: &Path,
    config: &ExtractionConfig,
    index: usize,
) -> Result<ReportResult, ExtractError> {
    let started = Instant::now();

    let page = render::render_first_page(pdf_path, config).await?;
    let image = encode::encode_png(&page).map_err(|e| ExtractError::RasterisationFailed {
        path: pdf_path.to_path_buf(),
        detail: format!("Image encoding failed: {e}"),
    })?;
    drop(page);

    let reply = llm::ask_model(provider, image, config).await?;
    let raw_reply = reply.content.trim().to_string();
    debug!("{}: model output: {}", name, raw_reply);

    if let Some(ref cb) = config.progress_callback {
        cb.on_model_reply(index, &raw_reply);
    }

    let fields: ReportFields = parse::parse_reply(&raw_reply);
    if fields.is_blank() {
        warn!("{}: model returned no values", name);
    }

    Ok(ReportResult {
        source: name.to_string(),
        fields,
        raw_reply,
        input_tokens: reply.input_tokens,
        output_tokens: reply.output_tokens,
        duration_ms: started.elapsed().as_millis() as u64,
        error: None,
    })
}

fn summarise(reports: &[ReportResult], total_duration_ms: u64) -> BatchStats {
    let extracted = reports.iter().filter(|r| r.is_ok()).count();
    BatchStats {
        total_reports: reports.len(),
        extracted_reports: extracted,
        failed_reports: reports.len() - extracted,
        total_input_tokens: reports.iter().map(|r| r.input_tokens as u64).sum(),
        total_output_tokens: reports.iter().map(|r| r.output_tokens as u64).sum(),
        total_duration_ms,
    }
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ExtractError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the provider, from most to least specific:
///
/// 1. `config.provider` — used as-is.
/// 2. `config.provider_name` with `config.model`.
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set.
/// 4. OpenAI with `config.model` when `OPENAI_API_KEY` is set.
/// 5. `ProviderFactory::from_env()` auto-detection.
fn resolve_provider(config: &ExtractionConfig) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        return create_vision_provider(name, &config.model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    if std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty()) {
        return create_vision_provider("openai", &config.model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ExtractError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY (or another provider key) or pass --provider.\n\
                Error: {e}"
            ),
        })?;

    Ok(llm_provider)
}
