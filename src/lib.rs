//! # ocr-gateway
//!
//! A small HTTP service that turns uploaded images and PDFs into text.
//!
//! Images go straight to an OCR provider. PDFs are rasterized page by page
//! (poppler's `pdftoppm` by default, or an in-process pdfium), each page is
//! OCR'd with bounded parallelism, and the page texts are joined in order
//! with a page-break marker. A second endpoint returns the rasterized pages
//! themselves as PNG data URLs.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload
//!  │
//!  ├─ 1. Classify  PDF by content type or `.pdf` filename, else image
//!  ├─ 2. Render    PDF → page images (poppler subprocess / pdfium)
//!  ├─ 3. Encode    page → PNG bytes (or data URL)
//!  ├─ 4. OCR       concurrent calls to Google Vision / a vision LLM
//!  └─ 5. Assemble  drop blank pages, join with "--- Page Break ---"
//! ```
//!
//! ## Library use
//!
//! ```rust,no_run
//! use ocr_gateway::{GatewayConfig, OcrPipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GatewayConfig::builder().vision_api_key("AIza...").build()?;
//!     let pipeline = OcrPipeline::from_config(&config)?;
//!     let pdf = std::fs::read("scan.pdf")?;
//!     let doc = pipeline.process_pdf(&pdf).await?;
//!     println!("{}", doc.into_message());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | The axum gateway and the `ocr-gateway` binary (axum, tower-http, clap, anyhow, tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
#[cfg(feature = "server")]
pub mod gateway;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod upload;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{GatewayConfig, GatewayConfigBuilder, OcrProviderKind, RasterBackend};
pub use convert::OcrPipeline;
pub use error::GatewayError;
pub use output::{DocumentText, ExtractedText};
pub use pipeline::extract::TextExtractor;
pub use pipeline::render::{PageImage, PageRasterizer, RenderOptions};
pub use upload::{classify, UploadKind, UploadedDocument};
