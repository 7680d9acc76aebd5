//! Poppler rasterizer: `pdfinfo` for the page count, `pdftoppm` for pixels.
//!
//! The PDF is written to a private temporary directory because both tools
//! need a file path. The page range is then split into `thread_hint`
//! contiguous chunks, each rendered by its own `pdftoppm` process, and the
//! resulting `page-<n>.png` files are read back ordered by `<n>`.

use crate::error::{GatewayError, PAGE_COUNT_FAILURE, POPPLER_HINT};
use async_trait::async_trait;
use futures::future::try_join_all;
use image::ImageFormat;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::render::{PageImage, PageRasterizer, RenderOptions};

static RE_PAGES: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^Pages:\s+(\d+)\s*$").unwrap());

static RE_PAGE_FILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-(\d+)\.png$").unwrap());

const OUTPUT_PREFIX: &str = "page";

/// Rasterizer that shells out to poppler-utils.
#[derive(Debug, Clone, Default)]
pub struct PopplerRasterizer {
    bin_dir: Option<PathBuf>,
}

impl PopplerRasterizer {
    /// `bin_dir` holds `pdfinfo` and `pdftoppm`; `None` relies on `PATH`.
    pub fn new(bin_dir: Option<PathBuf>) -> Self {
        Self { bin_dir }
    }

    fn binary(&self, name: &str) -> PathBuf {
        let file = format!("{}{}", name, std::env::consts::EXE_SUFFIX);
        match &self.bin_dir {
            Some(dir) => dir.join(file),
            None => PathBuf::from(file),
        }
    }

    async fn page_count(&self, pdf_path: &Path) -> Result<usize, GatewayError> {
        let output = Command::new(self.binary("pdfinfo"))
            .arg(pdf_path)
            .output()
            .await
            .map_err(|e| spawn_error("pdfinfo", e))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GatewayError::RasterizationFailed {
                detail: format!("{}.\n{}", PAGE_COUNT_FAILURE, stderr.trim()),
            });
        }

        parse_page_count(&stdout).ok_or_else(|| GatewayError::RasterizationFailed {
            detail: format!("{}.\npdfinfo printed no page count", PAGE_COUNT_FAILURE),
        })
    }

    async fn render_range(
        &self,
        pdf_path: &Path,
        out_dir: &Path,
        (first, last): (usize, usize),
        dpi: u32,
    ) -> Result<(), GatewayError> {
        debug!("pdftoppm: pages {}-{} at {} DPI", first, last, dpi);
        let output = Command::new(self.binary("pdftoppm"))
            .arg("-png")
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-f")
            .arg(first.to_string())
            .arg("-l")
            .arg(last.to_string())
            .arg(pdf_path)
            .arg(out_dir.join(OUTPUT_PREFIX))
            .output()
            .await
            .map_err(|e| spawn_error("pdftoppm", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GatewayError::RasterizationFailed {
                detail: format!(
                    "pdftoppm failed on pages {}-{}: {}",
                    first,
                    last,
                    stderr.trim()
                ),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PageRasterizer for PopplerRasterizer {
    fn backend(&self) -> &'static str {
        "poppler"
    }

    async fn rasterize(
        &self,
        pdf: &[u8],
        options: RenderOptions,
    ) -> Result<Vec<PageImage>, GatewayError> {
        let work_dir = TempDir::new().map_err(|e| GatewayError::Internal(e.to_string()))?;
        let pdf_path = work_dir.path().join("input.pdf");
        tokio::fs::write(&pdf_path, pdf)
            .await
            .map_err(|e| GatewayError::Internal(format!("Failed to write temp file: {}", e)))?;

        let total_pages = self.page_count(&pdf_path).await?;
        info!("PDF has {} pages", total_pages);
        if total_pages == 0 {
            return Ok(Vec::new());
        }

        let out_dir = work_dir.path().join("pages");
        tokio::fs::create_dir(&out_dir)
            .await
            .map_err(|e| GatewayError::Internal(e.to_string()))?;

        let ranges = page_ranges(total_pages, options.thread_hint);
        try_join_all(
            ranges
                .iter()
                .map(|&range| self.render_range(&pdf_path, &out_dir, range, options.dpi)),
        )
        .await?;

        let files = collect_page_files(&out_dir).await?;
        ensure_all_pages(&files, total_pages)?;

        // `work_dir` must outlive the decode; it is dropped (and deleted) on return.
        let pages = tokio::task::spawn_blocking(move || decode_pages(files))
            .await
            .map_err(|e| GatewayError::Internal(format!("Decode task panicked: {}", e)))??;
        drop(work_dir);
        Ok(pages)
    }
}

fn spawn_error(binary: &str, e: io::Error) -> GatewayError {
    if e.kind() == io::ErrorKind::NotFound {
        warn!("{} not found; poppler is not installed or not on PATH", binary);
        GatewayError::RasterizationUnavailable {
            backend: "poppler",
            hint: POPPLER_HINT.to_string(),
        }
    } else {
        GatewayError::RasterizationFailed {
            detail: format!("Failed to run {}: {}", binary, e),
        }
    }
}

fn parse_page_count(pdfinfo_stdout: &str) -> Option<usize> {
    RE_PAGES
        .captures(pdfinfo_stdout)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Split `1..=total` into at most `chunks` contiguous, near-equal ranges.
fn page_ranges(total: usize, chunks: usize) -> Vec<(usize, usize)> {
    if total == 0 {
        return Vec::new();
    }
    let chunks = chunks.clamp(1, total);
    let base = total / chunks;
    let extra = total % chunks;

    let mut ranges = Vec::with_capacity(chunks);
    let mut first = 1;
    for i in 0..chunks {
        let len = base + usize::from(i < extra);
        ranges.push((first, first + len - 1));
        first += len;
    }
    ranges
}

/// Page number encoded in a pdftoppm output name such as `page-007.png`.
fn page_number(file_name: &str) -> Option<usize> {
    RE_PAGE_FILE
        .captures(file_name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

async fn collect_page_files(dir: &Path) -> Result<Vec<(usize, PathBuf)>, GatewayError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| GatewayError::Internal(e.to_string()))?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| GatewayError::Internal(e.to_string()))?
    {
        let path = entry.path();
        let num = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(page_number);
        if let Some(num) = num {
            files.push((num, path));
        }
    }

    files.sort_by_key(|(num, _)| *num);
    Ok(files)
}

/// Every page `1..=total_pages` must have exactly one rendered file.
fn ensure_all_pages(files: &[(usize, PathBuf)], total_pages: usize) -> Result<(), GatewayError> {
    let complete = files.len() == total_pages
        && files.iter().enumerate().all(|(i, (num, _))| *num == i + 1);
    if complete {
        return Ok(());
    }

    warn!(
        "pdftoppm produced {} images for {} pages",
        files.len(),
        total_pages
    );
    Err(GatewayError::RasterizationFailed {
        detail: format!(
            "pdftoppm produced {} page images but the PDF has {} pages",
            files.len(),
            total_pages
        ),
    })
}

fn decode_pages(files: Vec<(usize, PathBuf)>) -> Result<Vec<PageImage>, GatewayError> {
    files
        .into_iter()
        .map(|(page_num, path)| {
            let bytes = std::fs::read(&path).map_err(|e| GatewayError::Internal(e.to_string()))?;
            let image = image::load_from_memory_with_format(&bytes, ImageFormat::Png).map_err(
                |e| GatewayError::RasterizationFailed {
                    detail: format!("pdftoppm wrote an unreadable image for page {}: {}", page_num, e),
                },
            )?;
            debug!(
                "Loaded page {} → {}x{} px",
                page_num,
                image.width(),
                image.height()
            );
            Ok(PageImage { page_num, image })
        })
        .collect()
}
