//! PDF rasterisation: turn PDF bytes into ordered page images.
//!
//! Two backends implement [`PageRasterizer`]:
//!
//! * [`PopplerRasterizer`](super::poppler::PopplerRasterizer) drives the
//!   `pdfinfo` / `pdftoppm` binaries as subprocesses (default).
//! * [`PdfiumRasterizer`] renders in-process through `pdfium-render`.
//!
//! ## Why spawn_blocking for pdfium?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto a dedicated thread pool
//! thread designed for blocking operations, preventing the Tokio worker
//! threads from stalling during CPU-heavy rendering.

use crate::config::{GatewayConfig, RasterBackend};
use crate::error::GatewayError;
use async_trait::async_trait;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use super::poppler::PopplerRasterizer;

/// One rendered page.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 1-based position in the source document.
    pub page_num: usize,
    pub image: DynamicImage,
}

/// Rendering parameters passed to every rasterize call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub dpi: u32,
    /// Concurrency hint; backends that render on one thread ignore it.
    pub thread_hint: usize,
}

impl RenderOptions {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            dpi: config.dpi,
            thread_hint: config.render_threads.max(1),
        }
    }
}

/// Converts PDF bytes into page images in document order.
///
/// A zero-page document yields `Ok(vec![])`. A missing backend yields
/// [`GatewayError::RasterizationUnavailable`]; a document the backend cannot
/// read yields [`GatewayError::RasterizationFailed`].
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    async fn rasterize(
        &self,
        pdf: &[u8],
        options: RenderOptions,
    ) -> Result<Vec<PageImage>, GatewayError>;
}

/// Build the configured rasterizer, resolving the backend directory once.
pub fn build_rasterizer(config: &GatewayConfig) -> Arc<dyn PageRasterizer> {
    let backend_dir = config.resolve_backend_path();
    match &backend_dir {
        Some(dir) => info!(
            "Rasterizer: {} from {}",
            config.raster_backend.name(),
            dir.display()
        ),
        None => info!(
            "Rasterizer: {} (system lookup)",
            config.raster_backend.name()
        ),
    }

    match config.raster_backend {
        RasterBackend::Poppler => Arc::new(PopplerRasterizer::new(backend_dir)),
        RasterBackend::Pdfium => Arc::new(PdfiumRasterizer::new(backend_dir)),
    }
}

// ── pdfium backend ───────────────────────────────────────────────────────

/// In-process rasterizer backed by a dynamically loaded libpdfium.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    library_dir: Option<PathBuf>,
}

impl PdfiumRasterizer {
    /// `library_dir` holds the platform pdfium library; `None` uses the
    /// system library search path.
    pub fn new(library_dir: Option<PathBuf>) -> Self {
        Self { library_dir }
    }
}

#[async_trait]
impl PageRasterizer for PdfiumRasterizer {
    fn backend(&self) -> &'static str {
        "pdfium"
    }

    async fn rasterize(
        &self,
        pdf: &[u8],
        options: RenderOptions,
    ) -> Result<Vec<PageImage>, GatewayError> {
        let bytes = pdf.to_vec();
        let library_dir = self.library_dir.clone();

        tokio::task::spawn_blocking(move || {
            render_pages_blocking(&bytes, library_dir.as_ref(), options.dpi)
        })
        .await
        .map_err(|e| GatewayError::Internal(format!("Render task panicked: {}", e)))?
    }
}

fn bind_pdfium(library_dir: Option<&PathBuf>) -> Result<Pdfium, GatewayError> {
    let bindings = match library_dir {
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| GatewayError::RasterizationUnavailable {
        backend: "pdfium",
        hint: format!(
            "pdfium is required for PDF processing but could not be loaded ({:?}). \
             Install libpdfium and set POPPLER_PATH to its directory, \
             or switch to the poppler backend.",
            e
        ),
    })?;

    Ok(Pdfium::new(bindings))
}

/// Blocking implementation of page rendering.
fn render_pages_blocking(
    pdf: &[u8],
    library_dir: Option<&PathBuf>,
    dpi: u32,
) -> Result<Vec<PageImage>, GatewayError> {
    let pdfium = bind_pdfium(library_dir)?;

    let document = pdfium
        .load_pdf_from_byte_slice(pdf, None)
        .map_err(|e| GatewayError::RasterizationFailed {
            detail: format!("Failed to open PDF: {:?}", e),
        })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    let render_config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / 72.0);

    let mut results = Vec::with_capacity(total_pages);
    for idx in 0..total_pages {
        let page = pages
            .get(idx as u16)
            .map_err(|e| GatewayError::RasterizationFailed {
                detail: format!("Rasterisation failed for page {}: {:?}", idx + 1, e),
            })?;

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            GatewayError::RasterizationFailed {
                detail: format!("Rasterisation failed for page {}: {:?}", idx + 1, e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );

        results.push(PageImage {
            page_num: idx + 1,
            image,
        });
    }

    Ok(results)
}
