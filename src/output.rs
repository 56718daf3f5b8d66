//! Result types returned by the extraction entry points.

use crate::error::{ExtractError, ReportError};
use crate::prompts::{COLUMNS, FIELD_COUNT};
use serde::{Deserialize, Serialize};

/// The nine values read from one Test Report Form.
///
/// Every field is kept as the model returned it (trimmed). Blank means the
/// model could not see the value, or returned too few values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFields {
    pub first_name: String,
    pub family_name: String,
    pub exam_date: String,
    pub listening: String,
    pub reading: String,
    pub writing: String,
    pub speaking: String,
    pub overall: String,
    pub cefr_level: String,
}

impl ReportFields {
    /// Build from values in [`COLUMNS`] order.
    pub fn from_row(row: [String; FIELD_COUNT]) -> Self {
        let [first_name, family_name, exam_date, listening, reading, writing, speaking, overall, cefr_level] =
            row;
        Self {
            first_name,
            family_name,
            exam_date,
            listening,
            reading,
            writing,
            speaking,
            overall,
            cefr_level,
        }
    }

    /// Values in [`COLUMNS`] order, one spreadsheet row.
    pub fn as_row(&self) -> [&str; FIELD_COUNT] {
        [
            &self.first_name,
            &self.family_name,
            &self.exam_date,
            &self.listening,
            &self.reading,
            &self.writing,
            &self.speaking,
            &self.overall,
            &self.cefr_level,
        ]
    }

    /// `(column title, value)` pairs, mainly for display.
    pub fn labelled(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        COLUMNS.into_iter().zip(self.as_row())
    }

    /// True when the model produced no usable value at all.
    pub fn is_blank(&self) -> bool {
        self.as_row().iter().all(|v| v.is_empty())
    }
}

/// Outcome of processing one input document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportResult {
    /// Display name of the input (file name or URL).
    pub source: String,

    /// Parsed fields. Blank when `error` is set.
    pub fields: ReportFields,

    /// Model reply before parsing, as shown to the user.
    pub raw_reply: String,

    pub input_tokens: usize,
    pub output_tokens: usize,

    /// Wall-clock time for render + model call.
    pub duration_ms: u64,

    /// Set when this report failed; it then contributes no spreadsheet row.
    pub error: Option<ReportError>,
}

impl ReportResult {
    pub fn failed(source: impl Into<String>, error: ReportError, duration_ms: u64) -> Self {
        Self {
            source: source.into(),
            fields: ReportFields::default(),
            raw_reply: String::new(),
            input_tokens: 0,
            output_tokens: 0,
            duration_ms,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate numbers for a batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_reports: usize,
    pub extracted_reports: usize,
    pub failed_reports: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
}

/// All reports of one run, in input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutput {
    pub reports: Vec<ReportResult>,
    pub stats: BatchStats,
}

impl BatchOutput {
    /// Spreadsheet rows: the fields of every successful report, input order.
    pub fn rows(&self) -> Vec<&ReportFields> {
        self.reports
            .iter()
            .filter(|r| r.is_ok())
            .map(|r| &r.fields)
            .collect()
    }

    /// Treat any failed report as an error.
    pub fn into_result(self) -> Result<Self, ExtractError> {
        let failed = self.stats.failed_reports;
        if failed > 0 {
            return Err(ExtractError::PartialFailure {
                success: self.stats.extracted_reports,
                failed,
                total: self.stats.total_reports,
            });
        }
        Ok(self)
    }
}
