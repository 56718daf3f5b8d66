//! Progress-callback trait for per-report extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to follow a
//! batch as it runs. The CLI uses it for its progress bar; library callers can
//! forward the events wherever they like.
//!
//! # Example
//!
//! ```rust
//! use ielts_extract::{ExtractionConfig, ExtractionProgressCallback, ReportFields};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl ExtractionProgressCallback for Printer {
//!     fn on_report_complete(&self, index: usize, total: usize, fields: &ReportFields) {
//!         eprintln!("{index}/{total}: {} {}", fields.first_name, fields.family_name);
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(Printer))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::ReportFields;
use std::sync::Arc;

/// Called by the batch loop as it processes each report.
///
/// All methods default to no-ops. Reports are processed one at a time, but
/// the trait is `Send + Sync` so a callback can be shared with other tasks.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once before the first report.
    fn on_batch_start(&self, total_reports: usize) {
        let _ = total_reports;
    }

    /// Called before a report is rendered.
    ///
    /// `index` is 1-based; `source` is the display name of the input.
    fn on_report_start(&self, index: usize, total_reports: usize, source: &str) {
        let _ = (index, total_reports, source);
    }

    /// Called with the model's reply before it is parsed.
    fn on_model_reply(&self, index: usize, reply: &str) {
        let _ = (index, reply);
    }

    /// Called after a report's fields were extracted.
    fn on_report_complete(&self, index: usize, total_reports: usize, fields: &ReportFields) {
        let _ = (index, total_reports, fields);
    }

    /// Called when a report fails.
    fn on_report_error(&self, index: usize, total_reports: usize, error: &str) {
        let _ = (index, total_reports, error);
    }

    /// Called once after every report has been attempted.
    fn on_batch_complete(&self, total_reports: usize, success_count: usize) {
        let _ = (total_reports, success_count);
    }
}

/// A no-op implementation.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// The type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
