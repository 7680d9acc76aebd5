//! Request-level orchestration: rasterize, encode, fan out OCR, fan in.
//!
//! [`OcrPipeline`] is built once at startup and shared by every request. It
//! holds no per-request state; each call owns its pages and results.

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::output::{DocumentText, ExtractedText};
use crate::pipeline::encode;
use crate::pipeline::extract::{build_extractor, TextExtractor};
use crate::pipeline::render::{build_rasterizer, PageImage, PageRasterizer, RenderOptions};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Rasterizer + OCR provider + the knobs that drive them.
#[derive(Clone)]
pub struct OcrPipeline {
    rasterizer: Arc<dyn PageRasterizer>,
    extractor: Arc<dyn TextExtractor>,
    render: RenderOptions,
    parallelism: usize,
}

impl OcrPipeline {
    pub fn new(
        rasterizer: Arc<dyn PageRasterizer>,
        extractor: Arc<dyn TextExtractor>,
        config: &GatewayConfig,
    ) -> Self {
        Self {
            rasterizer,
            extractor,
            render: RenderOptions::from_config(config),
            parallelism: config.ocr_parallelism.max(1),
        }
    }

    /// Build the configured rasterizer and OCR provider.
    ///
    /// Fails when the OCR provider lacks credentials. A missing rasterization
    /// backend is not detected here; PDF requests report it instead.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let rasterizer = build_rasterizer(config);
        let extractor = build_extractor(config)?;
        info!(
            "OCR pipeline: raster={} ocr={} dpi={} parallelism={}",
            rasterizer.backend(),
            extractor.provider(),
            config.dpi,
            config.ocr_parallelism
        );
        Ok(Self::new(rasterizer, extractor, config))
    }

    /// OCR a single image upload.
    pub async fn extract_image(&self, image: &[u8]) -> Result<ExtractedText, GatewayError> {
        let start = Instant::now();
        let raw = self.extractor.extract(image).await?;
        let text = ExtractedText::from_raw(raw);
        debug!(
            "Image OCR via {} in {:?} (text found: {})",
            self.extractor.provider(),
            start.elapsed(),
            text.is_found()
        );
        Ok(text)
    }

    /// Rasterize a PDF, OCR every page with bounded parallelism, and join the
    /// non-empty page texts in page order.
    ///
    /// Any page failure fails the whole document.
    pub async fn process_pdf(&self, pdf: &[u8]) -> Result<DocumentText, GatewayError> {
        let total_start = Instant::now();

        let pages = self.rasterize(pdf).await?;
        if pages.is_empty() {
            info!("PDF has no pages");
            return Ok(DocumentText::assemble(&[]));
        }

        let encoded = encode_all(pages).await?;
        let page_count = encoded.len();
        let workers = worker_count(self.parallelism, page_count);
        debug!("OCR fan-out: {} pages, {} workers", page_count, workers);

        let ocr_start = Instant::now();
        let mut page_texts = vec![String::new(); page_count];
        let mut results = stream::iter(encoded.into_iter().enumerate().map(|(slot, png)| {
            let extractor = Arc::clone(&self.extractor);
            async move { (slot, extractor.extract(&png).await) }
        }))
        .buffer_unordered(workers);

        while let Some((slot, result)) = results.next().await {
            match result {
                Ok(text) => page_texts[slot] = text,
                Err(e) => {
                    warn!("OCR failed on page {}/{}: {}", slot + 1, page_count, e);
                    return Err(e);
                }
            }
        }

        let document = DocumentText::assemble(&page_texts);
        info!(
            "PDF OCR complete: {}/{} pages with text, ocr {}ms, total {}ms",
            document.pages_with_text,
            document.page_count,
            ocr_start.elapsed().as_millis(),
            total_start.elapsed().as_millis()
        );
        Ok(document)
    }

    /// Rasterize a PDF into `data:image/png;base64,…` URLs, one per page.
    ///
    /// A PDF with zero pages is [`GatewayError::NoPages`].
    pub async fn pdf_to_data_urls(&self, pdf: &[u8]) -> Result<Vec<String>, GatewayError> {
        let pages = self.rasterize(pdf).await?;
        if pages.is_empty() {
            return Err(GatewayError::NoPages);
        }

        tokio::task::spawn_blocking(move || {
            pages.iter().map(encode::to_data_url).collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(|e| GatewayError::Internal(format!("encode task panicked: {}", e)))?
    }

    async fn rasterize(&self, pdf: &[u8]) -> Result<Vec<PageImage>, GatewayError> {
        let start = Instant::now();
        let pages = self.rasterizer.rasterize(pdf, self.render).await?;
        info!(
            "Rasterized {} pages via {} at {} DPI in {}ms",
            pages.len(),
            self.rasterizer.backend(),
            self.render.dpi,
            start.elapsed().as_millis()
        );
        Ok(pages)
    }
}

/// PNG-encode every page off the async runtime.
async fn encode_all(pages: Vec<PageImage>) -> Result<Vec<Vec<u8>>, GatewayError> {
    tokio::task::spawn_blocking(move || {
        pages.iter().map(encode::to_png).collect::<Result<Vec<_>, _>>()
    })
    .await
    .map_err(|e| GatewayError::Internal(format!("encode task panicked: {}", e)))?
}

/// Workers for one document: `min(parallelism, pages)`, never below one.
pub fn worker_count(parallelism: usize, pages: usize) -> usize {
    parallelism.min(pages).max(1)
}
