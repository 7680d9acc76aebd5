//! In-process fakes for the rasterizer and OCR provider seams.
//!
//! Each fake page is a tiny solid image whose red channel holds the page
//! number, so the fake extractor can tell which page it was handed after the
//! PNG round trip without any shared bookkeeping.

#![allow(dead_code)]

use async_trait::async_trait;
use image::{DynamicImage, Rgba, RgbaImage};
use ocr_gateway::{
    GatewayConfig, GatewayError, OcrPipeline, PageImage, PageRasterizer, RenderOptions,
    TextExtractor,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A page image that encodes its own page number.
pub fn numbered_page(page_num: usize) -> PageImage {
    PageImage {
        page_num,
        image: DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            4,
            4,
            Rgba([page_num as u8, 0, 0, 255]),
        )),
    }
}

/// Read the page number back out of an encoded page.
pub fn page_of(png: &[u8]) -> usize {
    let img = image::load_from_memory(png).expect("fake pages are valid PNG");
    img.to_rgba8().get_pixel(0, 0)[0] as usize
}

/// Rasterizer that returns `pages` numbered pages, or a fixed error.
pub struct FakeRasterizer {
    pub pages: usize,
    pub error: Option<fn() -> GatewayError>,
    pub calls: AtomicUsize,
}

impl FakeRasterizer {
    pub fn with_pages(pages: usize) -> Self {
        Self {
            pages,
            error: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: fn() -> GatewayError) -> Self {
        Self {
            pages: 0,
            error: Some(error),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PageRasterizer for FakeRasterizer {
    fn backend(&self) -> &'static str {
        "fake"
    }

    async fn rasterize(
        &self,
        _pdf: &[u8],
        _options: RenderOptions,
    ) -> Result<Vec<PageImage>, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(make) = self.error {
            return Err(make());
        }
        Ok((1..=self.pages).map(numbered_page).collect())
    }
}

/// Extractor that answers `"text of page N"`, with per-page overrides.
///
/// Pages listed in `blank` answer `""`; `fail_on` answers a provider error.
/// Earlier pages sleep longer, so completions arrive in reverse order.
#[derive(Default)]
pub struct FakeExtractor {
    pub blank: HashSet<usize>,
    pub fail_on: Option<usize>,
    pub delay_ms: u64,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub seen: Mutex<Vec<usize>>,
}

impl FakeExtractor {
    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl TextExtractor for FakeExtractor {
    fn provider(&self) -> &str {
        "fake"
    }

    async fn extract(&self, image: &[u8]) -> Result<String, GatewayError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let page = page_of(image);
        self.seen.lock().unwrap().push(page);

        if self.delay_ms > 0 {
            let slower_first = self.delay_ms * (20 - page.min(19) as u64);
            tokio::time::sleep(Duration::from_millis(slower_first)).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_on == Some(page) {
            return Err(GatewayError::ProviderError {
                message: format!("quota exceeded on page {page}"),
            });
        }
        if self.blank.contains(&page) {
            return Ok(String::new());
        }
        Ok(format!("text of page {page}"))
    }
}

pub fn pipeline(
    rasterizer: Arc<FakeRasterizer>,
    extractor: Arc<FakeExtractor>,
    parallelism: usize,
) -> OcrPipeline {
    init_test_logging();
    let config = GatewayConfig::builder()
        .ocr_parallelism(parallelism)
        .build()
        .unwrap();
    OcrPipeline::new(rasterizer, extractor, &config)
}

/// Route `tracing` output through the test harness. Filtered by `RUST_LOG`;
/// safe to call from every test.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
