//! API request handlers.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use tracing::{debug, info};

use crate::error::GatewayError;
use crate::output::NO_TEXT_DETECTED;
use crate::upload::{UploadKind, UploadedDocument};

use super::{
    error::ApiError,
    types::{AppState, HealthResponse, OcrResponse, PdfImagesResponse},
};

/// Name of the multipart field carrying the upload.
const FILE_FIELD: &str = "file";

/// Health check endpoint handler.
///
/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

/// OCR endpoint handler.
///
/// POST /ocr
///
/// PDFs (by content type or `.pdf` filename) are rasterized and every page is
/// OCR'd; anything else is sent to the OCR provider as a single image.
pub async fn ocr_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<OcrResponse>, ApiError> {
    let upload = read_upload(multipart).await?;
    let bytes = upload.non_empty_bytes()?;

    let text = match upload.kind() {
        UploadKind::Pdf => {
            info!("OCR request: PDF, {} bytes", bytes.len());
            state.pipeline.process_pdf(bytes).await?.into_message()
        }
        UploadKind::Image => {
            info!("OCR request: image, {} bytes", bytes.len());
            state
                .pipeline
                .extract_image(bytes)
                .await?
                .into_message(NO_TEXT_DETECTED)
        }
    };

    Ok(Json(OcrResponse { text }))
}

/// PDF-to-images endpoint handler.
///
/// POST /pdf-to-images
///
/// Emptiness is checked before the PDF check, so an empty upload with an
/// image content type still reports "Uploaded file is empty".
pub async fn pdf_to_images_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PdfImagesResponse>, ApiError> {
    let upload = read_upload(multipart).await?;
    let bytes = upload.non_empty_bytes()?;

    if upload.kind() != UploadKind::Pdf {
        return Err(GatewayError::UnsupportedUpload {
            reason: "File is not a PDF".to_string(),
        }
        .into());
    }

    info!("PDF-to-images request: {} bytes", bytes.len());
    let images = state.pipeline.pdf_to_data_urls(bytes).await?;
    let page_count = images.len();

    Ok(Json(PdfImagesResponse { images, page_count }))
}

/// Pull the single uploaded file out of a multipart body.
///
/// Takes the field named `file`; failing that, the first field that carries a
/// filename. Other fields are ignored.
async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<UploadedDocument, ApiError> {
    let mut multipart = multipart.map_err(|e| {
        debug!("Multipart rejected: {}", e);
        ApiError::from(GatewayError::MissingUpload)
    })?;

    let mut fallback: Option<UploadedDocument> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(e.status(), e.body_text()))?
    {
        let is_file_field = field.name() == Some(FILE_FIELD);
        if !is_file_field && (fallback.is_some() || field.file_name().is_none()) {
            continue;
        }

        let filename = field.file_name().map(|s| s.to_string());
        let content_type = field.content_type().map(|s| s.to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?;

        debug!(
            "Upload field: name={:?} type={:?} size={}",
            filename,
            content_type,
            data.len()
        );
        let upload = UploadedDocument::new(data.to_vec(), content_type, filename);

        if is_file_field {
            return Ok(upload);
        }
        fallback = Some(upload);
    }

    fallback.ok_or_else(|| GatewayError::MissingUpload.into())
}
