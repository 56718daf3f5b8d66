//! Configuration for report extraction.
//!
//! All behaviour is controlled through [`ExtractionConfig`], built via
//! [`ExtractionConfigBuilder`]. One struct for every knob makes it easy to
//! share a config between the CLI, library callers and tests.

use crate::error::ExtractError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Spreadsheet file name used by the CLI when `--output` is not given.
pub const DEFAULT_OUTPUT_FILE: &str = "IELTS Results.xlsx";

/// Configuration for extracting one or more Test Report Forms.
///
/// # Example
/// ```rust
/// use ielts_extract::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .dpi(200)
///     .model("gpt-4o-mini")
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 200);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Rendering DPI for page one. Range: 72–400. Default: 300.
    ///
    /// Report forms carry small print (centre number, candidate number,
    /// the CEFR box), so the default is higher than for body text.
    pub dpi: u32,

    /// Cap on either edge of the rendered image, in pixels. Default: 4000.
    ///
    /// A4 at 300 DPI is 2480 × 3508 px and fits under the cap; oversized or
    /// misreported page boxes are scaled down instead of exhausting memory.
    pub max_rendered_pixels: u32,

    /// Model identifier. Default: `gpt-4o`.
    pub model: String,

    /// Provider name (e.g. "openai", "anthropic", "gemini", "ollama").
    /// If None, the provider is auto-detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.0.
    pub temperature: f32,

    /// Maximum tokens in the model reply. Default: 300.
    ///
    /// Nine short values rarely need more than 40 tokens; the headroom covers
    /// models that echo labels despite the prompt.
    pub max_tokens: usize,

    /// PDF user password for encrypted reports.
    pub password: Option<String>,

    /// Replacement for [`crate::prompts::EXTRACTION_PROMPT`].
    pub prompt: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Timeout for the model call in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Worksheet name in the exported workbook. Default: `Sheet1`.
    pub sheet_name: String,

    /// Optional progress callback for per-report events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            max_rendered_pixels: 4000,
            model: DEFAULT_MODEL.to_string(),
            provider_name: None,
            provider: None,
            temperature: 0.0,
            max_tokens: 300,
            password: None,
            prompt: None,
            download_timeout_secs: 120,
            api_timeout_secs: 60,
            sheet_name: "Sheet1".to_string(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("prompt", &self.prompt.as_ref().map(|p| p.len()))
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("sheet_name", &self.sheet_name)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The prompt actually sent to the model.
    pub fn effective_prompt(&self) -> &str {
        self.prompt
            .as_deref()
            .unwrap_or(crate::prompts::EXTRACTION_PROMPT)
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn sheet_name(mut self, name: impl Into<String>) -> Self {
        self.config.sheet_name = name.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(ExtractError::InvalidConfig("model must not be empty".into()));
        }
        if c.max_tokens == 0 {
            return Err(ExtractError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(ExtractError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        validate_sheet_name(&c.sheet_name)?;
        if let Some(p) = &c.prompt {
            if p.trim().is_empty() {
                return Err(ExtractError::InvalidConfig("prompt must not be empty".into()));
            }
        }
        Ok(self.config)
    }
}

/// Excel rejects sheet names that are empty, longer than 31 characters, or
/// contain any of `[]:*?/\`.
fn validate_sheet_name(name: &str) -> Result<(), ExtractError> {
    let len = name.chars().count();
    if len == 0 || len > 31 {
        return Err(ExtractError::InvalidConfig(format!(
            "sheet name must be 1–31 characters, got {len}"
        )));
    }
    if let Some(bad) = name.chars().find(|c| "[]:*?/\\".contains(*c)) {
        return Err(ExtractError::InvalidConfig(format!(
            "sheet name may not contain '{bad}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_report_extraction() {
        let c = ExtractionConfig::default();
        assert_eq!(c.dpi, 300);
        assert_eq!(c.model, "gpt-4o");
        assert_eq!(c.temperature, 0.0);
        assert_eq!(c.sheet_name, "Sheet1");
        assert!(c.effective_prompt().contains("IELTS Test Report Form"));
    }

    #[test]
    fn builder_clamps_dpi_and_temperature() {
        let c = ExtractionConfig::builder()
            .dpi(1200)
            .temperature(-1.0)
            .build()
            .unwrap();
        assert_eq!(c.dpi, 400);
        assert_eq!(c.temperature, 0.0);

        let c = ExtractionConfig::builder().dpi(10).build().unwrap();
        assert_eq!(c.dpi, 72);
    }

    #[test]
    fn custom_prompt_replaces_default() {
        let c = ExtractionConfig::builder()
            .prompt("Return nine blanks.")
            .build()
            .unwrap();
        assert_eq!(c.effective_prompt(), "Return nine blanks.");
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(ExtractionConfig::builder().model(" ").build().is_err());
        assert!(ExtractionConfig::builder().max_tokens(0).build().is_err());
        assert!(ExtractionConfig::builder().api_timeout_secs(0).build().is_err());
        assert!(ExtractionConfig::builder().prompt("  ").build().is_err());
    }

    #[test]
    fn sheet_name_rules() {
        assert!(ExtractionConfig::builder().sheet_name("Results 2026").build().is_ok());
        assert!(ExtractionConfig::builder().sheet_name("").build().is_err());
        assert!(ExtractionConfig::builder().sheet_name("a/b").build().is_err());
        assert!(ExtractionConfig::builder()
            .sheet_name("x".repeat(32))
            .build()
            .is_err());
    }

    #[test]
    fn debug_redacts_password() {
        let c = ExtractionConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }
}
