//! The model call: one chat request carrying the prompt and the page image.
//!
//! There is exactly one request per report and it is not retried. A provider
//! error or a timeout is surfaced to the caller as-is.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Text and token usage returned by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelReply {
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Ask the model to read the rendered report.
///
/// The request is a single user turn whose text part is the extraction
/// prompt and whose image part is the page PNG.
pub async fn ask_model(
    provider: &Arc<dyn LLMProvider>,
    image: ImageData,
    config: &ExtractionConfig,
) -> Result<ModelReply, ExtractError> {
    let messages = build_messages(config.effective_prompt(), image);
    let options = build_options(config);
    let limit = Duration::from_secs(config.api_timeout_secs);

    let response = tokio::time::timeout(limit, provider.chat(&messages, Some(&options)))
        .await
        .map_err(|_| ExtractError::ApiTimeout {
            secs: config.api_timeout_secs,
        })?
        .map_err(|e| ExtractError::LlmApiError {
            message: e.to_string(),
        })?;

    debug!(
        "{}: {} input tokens, {} output tokens",
        config.model, response.prompt_tokens, response.completion_tokens
    );

    Ok(ModelReply {
        content: response.content,
        input_tokens: response.prompt_tokens,
        output_tokens: response.completion_tokens,
    })
}

fn build_messages(prompt: &str, image: ImageData) -> Vec<ChatMessage> {
    vec![ChatMessage::user_with_images(prompt, vec![image])]
}

fn build_options(config: &ExtractionConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_defaults() {
        let opts = build_options(&ExtractionConfig::default());
        assert_eq!(opts.temperature, Some(0.0));
        assert_eq!(opts.max_tokens, Some(300));
    }

    #[test]
    fn single_user_turn_carries_prompt_and_image() {
        let image = ImageData::new("iVBORw0KGgo=".to_string(), "image/png");
        let messages = build_messages("read the form", image);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "read the form");
        let images = messages[0].images.as_ref().expect("image attached");
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].mime_type, "image/png");
    }
}
