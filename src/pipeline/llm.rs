//! Vision-LLM OCR: ask a multimodal model to transcribe an image.
//!
//! An alternative [`TextExtractor`] for deployments without Google Cloud
//! credentials. The image goes out as a base64 attachment on a single user
//! turn; the system turn carries [`TRANSCRIPTION_PROMPT`]. No retries are
//! attempted here: a failed call fails the request.

use crate::config::{GatewayConfig, DEFAULT_LLM_MODEL};
use crate::error::GatewayError;
use crate::prompts::TRANSCRIPTION_PROMPT;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use super::extract::TextExtractor;

/// Low temperature keeps the transcription faithful to the page.
const TEMPERATURE: f32 = 0.0;

/// Dense pages can run past 2 000 output tokens.
const MAX_TOKENS: usize = 4096;

/// Text extractor backed by an `edgequake-llm` vision provider.
pub struct VisionLlmExtractor {
    provider: Arc<dyn LLMProvider>,
    label: String,
}

impl VisionLlmExtractor {
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
        }
    }

    /// Resolve the provider, from most-specific to least-specific.
    ///
    /// 1. **Named provider** (`config.llm_provider`) with `config.llm_model`
    ///    or the default model.
    /// 2. **OpenAI key present** (`OPENAI_API_KEY`) → OpenAI with the model.
    /// 3. **Full auto-detection** (`ProviderFactory::from_env`).
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let model = config.llm_model.as_deref().unwrap_or(DEFAULT_LLM_MODEL);

        if let Some(ref name) = config.llm_provider {
            let provider = create_vision_provider(name, model)?;
            return Ok(Self::new(provider, format!("llm:{}/{}", name, model)));
        }

        if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
            if !openai_key.is_empty() {
                let provider = create_vision_provider("openai", model)?;
                return Ok(Self::new(provider, format!("llm:openai/{}", model)));
            }
        }

        let (provider, _embedding) =
            ProviderFactory::from_env().map_err(|e| GatewayError::ProviderNotConfigured {
                provider: "llm".to_string(),
                hint: format!(
                    "No LLM provider could be auto-detected from environment.\n\
                     Set OPENAI_API_KEY, ANTHROPIC_API_KEY, GEMINI_API_KEY, or EDGEQUAKE_LLM_PROVIDER.\n\
                     Error: {}",
                    e
                ),
            })?;

        Ok(Self::new(provider, "llm:auto"))
    }
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, GatewayError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        GatewayError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// MIME type of an encoded image, sniffed from its magic bytes.
fn sniff_mime(image: &[u8]) -> &'static str {
    image::guess_format(image)
        .map(|f| f.to_mime_type())
        .unwrap_or("image/png")
}

fn build_options() -> CompletionOptions {
    CompletionOptions {
        temperature: Some(TEMPERATURE),
        max_tokens: Some(MAX_TOKENS),
        ..Default::default()
    }
}

#[async_trait]
impl TextExtractor for VisionLlmExtractor {
    fn provider(&self) -> &str {
        &self.label
    }

    async fn extract(&self, image: &[u8]) -> Result<String, GatewayError> {
        let start = Instant::now();
        let image_data =
            ImageData::new(STANDARD.encode(image), sniff_mime(image)).with_detail("high");

        // The empty user text is intentional: the image carries all the content.
        let messages = vec![
            ChatMessage::system(TRANSCRIPTION_PROMPT),
            ChatMessage::user_with_images("", vec![image_data]),
        ];

        let options = build_options();
        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| {
                warn!("{}: transcription failed: {}", self.label, e);
                GatewayError::ProviderError {
                    message: format!("{}", e),
                }
            })?;

        debug!(
            "{}: {} input tokens, {} output tokens, {:?}",
            self.label,
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        Ok(response.content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_are_deterministic() {
        let opts = build_options();
        assert_eq!(opts.temperature, Some(0.0));
        assert_eq!(opts.max_tokens, Some(4096));
    }

    #[test]
    fn sniffs_common_formats() {
        assert_eq!(sniff_mime(b"\x89PNG\r\n\x1a\n\0\0\0\0"), "image/png");
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0]), "image/jpeg");
        assert_eq!(sniff_mime(b"not an image"), "image/png");
    }
}
