//! HTTP gateway for the OCR pipeline.
//!
//! # Endpoints
//!
//! - `GET /health` - Liveness probe, always `{"ok": true}`
//! - `POST /ocr` - OCR an uploaded image or PDF (multipart form data)
//! - `POST /pdf-to-images` - Rasterize an uploaded PDF into PNG data URLs
//!
//! Failures come back as `{"error": "<message>"}` with a 4xx/5xx status.
//!
//! # Examples
//!
//! ```no_run
//! use ocr_gateway::{GatewayConfig, OcrPipeline};
//! use ocr_gateway::gateway::{serve, RouterOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GatewayConfig::builder().vision_api_key("AIza...").build()?;
//!     let pipeline = OcrPipeline::from_config(&config)?;
//!     serve("0.0.0.0", 8001, pipeline, RouterOptions::from_config(&config)).await?;
//!     Ok(())
//! }
//! ```
//!
//! # cURL Examples
//!
//! ```bash
//! curl -F "file=@receipt.jpg" http://localhost:8001/ocr
//! curl -F "file=@contract.pdf" http://localhost:8001/ocr
//! curl -F "file=@contract.pdf" http://localhost:8001/pdf-to-images
//! ```

mod error;
mod handlers;
mod server;
mod types;

pub use error::ApiError;
pub use server::{create_router, serve};
pub use types::{AppState, ErrorResponse, HealthResponse, OcrResponse, PdfImagesResponse, RouterOptions};
