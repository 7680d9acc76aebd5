//! Gateway state and wire types.

use serde::{Deserialize, Serialize};

use crate::config::GatewayConfig;
use crate::convert::OcrPipeline;

/// Shared handler state; cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: OcrPipeline,
}

/// HTTP-layer settings that do not affect the pipeline.
#[derive(Debug, Clone)]
pub struct RouterOptions {
    /// Maximum request body size in bytes. Default: 100 MB.
    pub max_upload_bytes: usize,

    /// Allowed CORS origins. Empty means any origin.
    pub cors_origins: Vec<String>,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            max_upload_bytes: 100 * 1024 * 1024,
            cors_origins: Vec::new(),
        }
    }
}

impl RouterOptions {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            max_upload_bytes: config.max_upload_bytes,
            ..Self::default()
        }
    }

    /// Parse a comma-separated origin list (`OCR_CORS_ORIGINS`).
    pub fn with_cors_origins(mut self, origins: &str) -> Self {
        self.cors_origins = origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        self
    }
}

/// `GET /health` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
}

/// `POST /ocr` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrResponse {
    /// Extracted text, or a "No text detected" sentinel.
    pub text: String,
}

/// `POST /pdf-to-images` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfImagesResponse {
    /// `data:image/png;base64,…` URLs in page order.
    pub images: Vec<String>,
    #[serde(rename = "pageCount")]
    pub page_count: usize,
}

/// Body of every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
