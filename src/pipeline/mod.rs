//! Pipeline stages for turning an upload into text or page images.
//!
//! Each submodule implements exactly one step, so a stage can be swapped
//! (poppler vs. pdfium, Google Vision vs. a vision LLM) without touching the
//! others.
//!
//! ## Data Flow
//!
//! ```text
//! PDF ──▶ render ──▶ encode ──▶ extract
//!         (poppler/   (PNG)     (Vision API / VLM)
//!          pdfium)
//! ```
//!
//! 1. [`render`]: the [`render::PageRasterizer`] seam plus the pdfium
//!    backend; [`poppler`] holds the subprocess backend
//! 2. [`encode`]: PNG bytes for the OCR call, data URLs for `/pdf-to-images`
//! 3. [`extract`]: the [`extract::TextExtractor`] seam; [`vision`] and
//!    [`llm`] implement it and are the only stages with network I/O

pub mod encode;
pub mod extract;
pub mod llm;
pub mod poppler;
pub mod render;
pub mod vision;
