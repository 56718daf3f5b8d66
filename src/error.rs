//! Error types for the ielts-extract library.
//!
//! Two error types reflect two failure scopes:
//!
//! * [`ExtractError`] — **Fatal**: nothing useful can be produced (no inputs,
//!   provider not configured, spreadsheet cannot be written). Returned as
//!   `Err` from the batch entry points, and from the single-report entry
//!   points for anything that stops that report.
//!
//! * [`ReportError`] — **Non-fatal**: one document in a batch failed. It is
//!   stored inside [`crate::output::ReportResult`] so the remaining reports
//!   still reach the spreadsheet.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors returned by the ielts-extract library.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The batch was started with an empty input list.
    #[error("Please upload at least one report.")]
    NoInputs,

    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// URL download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The PDF parsed but contains no pages to render.
    #[error("PDF '{path}' has no pages")]
    EmptyDocument { path: PathBuf },

    /// pdfium-render failed while rasterising the report page.
    #[error("Rasterisation failed for '{path}': {detail}")]
    RasterisationFailed { path: PathBuf, detail: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The provider returned an error for the extraction request.
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    /// The extraction request did not finish within `api_timeout_secs`.
    #[error("LLM call timed out after {secs}s")]
    ApiTimeout { secs: u64 },

    // ── Batch errors ──────────────────────────────────────────────────────
    /// Every report in the batch failed; the spreadsheet would be empty.
    #[error("All {total} reports failed.\nFirst error: {first_error}")]
    AllReportsFailed { total: usize, first_error: String },

    /// Some reports succeeded but at least one failed.
    ///
    /// Returned by [`crate::output::BatchOutput::into_result`].
    #[error("{failed}/{total} reports failed during extraction")]
    PartialFailure {
        success: usize,
        failed: usize,
        total: usize,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the spreadsheet.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The xlsx container could not be assembled.
    #[error("Failed to build spreadsheet: {0}")]
    SpreadsheetFailed(String),

    // ── Config errors ─────────────────────────────────────────────────────
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDFium is downloaded automatically on first run.\n\
If that failed, set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<zip::result::ZipError> for ExtractError {
    fn from(e: zip::result::ZipError) -> Self {
        ExtractError::SpreadsheetFailed(e.to_string())
    }
}

/// A non-fatal error for a single report in a batch.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ReportError {
    /// The document could not be opened or is not a PDF.
    #[error("{source_name}: cannot read document: {detail}")]
    InputFailed { source_name: String, detail: String },

    /// Page one could not be rasterised or encoded.
    #[error("{source_name}: rendering failed: {detail}")]
    RenderFailed { source_name: String, detail: String },

    /// The model call failed or timed out.
    #[error("{source_name}: LLM call failed: {detail}")]
    LlmFailed { source_name: String, detail: String },
}

impl ReportError {
    /// Classify a fatal single-report error for storage in a batch result.
    pub fn from_extract(source_name: &str, err: &ExtractError) -> Self {
        let source_name = source_name.to_string();
        let detail = err.to_string();
        match err {
            ExtractError::CorruptPdf { .. }
            | ExtractError::PasswordRequired { .. }
            | ExtractError::WrongPassword { .. }
            | ExtractError::EmptyDocument { .. }
            | ExtractError::RasterisationFailed { .. }
            | ExtractError::PdfiumBindingFailed(_) => ReportError::RenderFailed {
                source_name,
                detail,
            },
            ExtractError::LlmApiError { .. }
            | ExtractError::ApiTimeout { .. }
            | ExtractError::ProviderNotConfigured { .. } => ReportError::LlmFailed {
                source_name,
                detail,
            },
            _ => ReportError::InputFailed {
                source_name,
                detail,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_inputs_matches_upload_message() {
        assert_eq!(
            ExtractError::NoInputs.to_string(),
            "Please upload at least one report."
        );
    }

    #[test]
    fn partial_failure_display() {
        let e = ExtractError::PartialFailure {
            success: 4,
            failed: 1,
            total: 5,
        };
        assert!(e.to_string().contains("1/5"), "got: {e}");
    }

    #[test]
    fn api_timeout_display() {
        let e = ExtractError::ApiTimeout { secs: 60 };
        assert!(e.to_string().contains("60s"));
    }

    #[test]
    fn classify_render_and_llm_errors() {
        let e = ExtractError::EmptyDocument {
            path: PathBuf::from("blank.pdf"),
        };
        assert!(matches!(
            ReportError::from_extract("blank.pdf", &e),
            ReportError::RenderFailed { .. }
        ));

        let e = ExtractError::LlmApiError {
            message: "401 unauthorized".into(),
        };
        let r = ReportError::from_extract("trf.pdf", &e);
        assert!(matches!(r, ReportError::LlmFailed { .. }));
        assert!(r.to_string().starts_with("trf.pdf:"));
        assert!(r.to_string().contains("401 unauthorized"));
    }

    #[test]
    fn classify_input_errors() {
        let e = ExtractError::NotAPdf {
            path: PathBuf::from("notes.txt"),
            magic: *b"hell",
        };
        assert!(matches!(
            ReportError::from_extract("notes.txt", &e),
            ReportError::InputFailed { .. }
        ));
    }
}
