//! The OCR seam: one image in, its text out.

use crate::config::{GatewayConfig, OcrProviderKind};
use crate::error::GatewayError;
use async_trait::async_trait;
use std::sync::Arc;

use super::llm::VisionLlmExtractor;
use super::vision::GoogleVisionExtractor;

/// Extracts text from a single encoded image (PNG, JPEG, …).
///
/// `Ok("")` means the provider found no text; it is not an error.
/// Implementations are shared across requests and must be safe for
/// concurrent calls.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Provider name for logs.
    fn provider(&self) -> &str;

    async fn extract(&self, image: &[u8]) -> Result<String, GatewayError>;
}

/// Build the configured OCR provider.
///
/// Fails with [`GatewayError::ProviderNotConfigured`] when the LLM provider
/// cannot be built. Google Vision without a key or token falls back to
/// Application Default Credentials, resolved on the first request.
pub fn build_extractor(config: &GatewayConfig) -> Result<Arc<dyn TextExtractor>, GatewayError> {
    match config.ocr_provider {
        OcrProviderKind::GoogleVision => Ok(Arc::new(GoogleVisionExtractor::from_config(config)?)),
        OcrProviderKind::Llm => Ok(Arc::new(VisionLlmExtractor::from_config(config)?)),
    }
}
