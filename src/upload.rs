//! Upload classification: decide whether an upload goes down the PDF path.
//!
//! Classification looks only at what the client declared (content type and
//! filename), never at the bytes. A JPEG named `scan.pdf` is therefore sent
//! to the rasterizer, which rejects it with a normal rasterization error.

use crate::error::GatewayError;

/// MIME type that marks an upload as a PDF.
pub const PDF_MIME: &str = "application/pdf";

/// Which pipeline path an upload takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    /// Rasterize, OCR every page, join the page texts.
    Pdf,
    /// Send the raw bytes straight to the OCR provider.
    Image,
}

/// A single uploaded file, owned by the request handling it.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub filename: Option<String>,
}

impl UploadedDocument {
    pub fn new(
        bytes: impl Into<Vec<u8>>,
        content_type: Option<String>,
        filename: Option<String>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            content_type,
            filename,
        }
    }

    pub fn kind(&self) -> UploadKind {
        classify(self.content_type.as_deref(), self.filename.as_deref())
    }

    /// Borrow the bytes, rejecting an empty upload.
    pub fn non_empty_bytes(&self) -> Result<&[u8], GatewayError> {
        if self.bytes.is_empty() {
            Err(GatewayError::EmptyUpload)
        } else {
            Ok(&self.bytes)
        }
    }
}

/// Classify an upload from its declared content type and filename.
///
/// Content-type parameters (`; charset=…`) are ignored and both checks are
/// case-insensitive. With neither signal present the upload is an image.
pub fn classify(content_type: Option<&str>, filename: Option<&str>) -> UploadKind {
    let pdf_mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|essence| essence.trim().eq_ignore_ascii_case(PDF_MIME))
        .unwrap_or(false);

    let pdf_name = filename
        .map(|name| name.to_ascii_lowercase().ends_with(".pdf"))
        .unwrap_or(false);

    if pdf_mime || pdf_name {
        UploadKind::Pdf
    } else {
        UploadKind::Image
    }
}
