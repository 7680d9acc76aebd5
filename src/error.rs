//! Error types for the OCR gateway.
//!
//! A single [`GatewayError`] travels through every stage of the pipeline as an
//! explicit `Result`. No stage swallows or rewrites an error on its way up;
//! the HTTP boundary ([`crate::gateway`]) is the only place a failure turns
//! into a user-facing message, via [`GatewayError::user_message`].
//!
//! There is deliberately no per-page error type: one failed page fails the
//! whole document, so a page failure is just a `GatewayError` carrying the
//! page number in its message.

use thiserror::Error;

/// Substring emitted by poppler tooling when `pdfinfo` cannot read a PDF
/// (missing binary, unreadable file, broken xref table).
pub const PAGE_COUNT_FAILURE: &str = "Unable to get page count";

/// Message returned in place of any error carrying [`PAGE_COUNT_FAILURE`].
pub const POPPLER_HINT: &str = "Poppler is required for PDF processing. \
Install it (macOS: `brew install poppler`, Debian/Ubuntu: `apt install poppler-utils`) \
and ensure `pdfinfo`/`pdftoppm` are in PATH, or set POPPLER_PATH to their directory.";

/// All errors produced by the gateway library.
#[derive(Debug, Error)]
pub enum GatewayError {
    // ── Upload errors ─────────────────────────────────────────────────────
    /// The uploaded file has no bytes.
    #[error("Uploaded file is empty")]
    EmptyUpload,

    /// The multipart request did not carry a file part.
    #[error("No file uploaded")]
    MissingUpload,

    /// The upload is valid but not usable for the requested operation,
    /// e.g. an image sent to the PDF-to-images endpoint.
    #[error("{reason}")]
    UnsupportedUpload { reason: String },

    // ── Rasterization errors ──────────────────────────────────────────────
    /// No PDF rendering backend is installed or it could not be loaded.
    #[error("{hint}")]
    RasterizationUnavailable { backend: &'static str, hint: String },

    /// The backend ran but could not render the document.
    #[error("{detail}")]
    RasterizationFailed { detail: String },

    /// The PDF rendered to zero pages where at least one was required.
    #[error("Could not extract pages from PDF")]
    NoPages,

    /// A rendered page could not be encoded as PNG.
    #[error("Image encoding failed for page {page}: {detail}")]
    ImageEncoding { page: usize, detail: String },

    // ── OCR provider errors ───────────────────────────────────────────────
    /// The OCR provider answered, but reported an error.
    #[error("{message}")]
    ProviderError { message: String },

    /// The OCR call could not be completed (network, timeout, bad body).
    #[error("OCR request failed: {detail}")]
    TransportError { detail: String },

    /// The configured OCR provider is missing credentials or cannot be built.
    #[error("OCR provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (task join failure, temp file I/O, …).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Message shown to API clients.
    ///
    /// Identical to `Display` except that any error mentioning
    /// [`PAGE_COUNT_FAILURE`] becomes the fixed [`POPPLER_HINT`].
    pub fn user_message(&self) -> String {
        let message = self.to_string();
        if message.contains(PAGE_COUNT_FAILURE) {
            POPPLER_HINT.to_string()
        } else {
            message
        }
    }
}
