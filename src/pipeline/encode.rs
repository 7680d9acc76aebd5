//! Image encoding: rendered page → PNG bytes, or → base64 PNG data URL.
//!
//! PNG is lossless, so text edges stay crisp for the OCR provider and the
//! images returned by `/pdf-to-images` look exactly like the rendered page.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::io::Cursor;
use tracing::debug;

use super::render::PageImage;
use crate::error::GatewayError;

const DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Encode a rasterised page as PNG bytes.
pub fn to_png(page: &PageImage) -> Result<Vec<u8>, GatewayError> {
    let mut buf = Vec::new();
    page.image
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| GatewayError::ImageEncoding {
            page: page.page_num,
            detail: e.to_string(),
        })?;

    debug!("Encoded page {} → {} bytes PNG", page.page_num, buf.len());
    Ok(buf)
}

/// Encode a rasterised page as a `data:image/png;base64,…` URL.
pub fn to_data_url(page: &PageImage) -> Result<String, GatewayError> {
    let png = to_png(page)?;
    Ok(format!("{}{}", DATA_URL_PREFIX, STANDARD.encode(&png)))
}
