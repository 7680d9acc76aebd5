//! Router construction and the serve loop.

use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::convert::OcrPipeline;
use crate::error::GatewayError;

use super::{
    handlers::{health_handler, ocr_handler, pdf_to_images_handler},
    types::{AppState, RouterOptions},
};

fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<_> = origins
        .iter()
        .filter_map(|s| s.parse::<axum::http::HeaderValue>().ok())
        .collect();

    if parsed.is_empty() {
        if !origins.is_empty() {
            tracing::warn!("OCR_CORS_ORIGINS set but invalid - falling back to permissive CORS");
        }
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        tracing::info!("CORS configured with {} explicit allowed origin(s)", parsed.len());
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(parsed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Create the gateway router.
///
/// Upload size is enforced by `DefaultBodyLimit` inside the multipart
/// extractor, so an oversized body surfaces as a multipart error and gets the
/// same JSON error body as every other failure.
///
/// Public so the routes can be nested into a larger application or driven
/// directly in tests.
pub fn create_router(pipeline: OcrPipeline, options: RouterOptions) -> Router {
    let state = AppState { pipeline };

    Router::new()
        .route("/health", get(health_handler))
        .route("/ocr", post(ocr_handler))
        .route("/pdf-to-images", post(pdf_to_images_handler))
        .layer(DefaultBodyLimit::max(options.max_upload_bytes))
        .layer(cors_layer(&options.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `host:port` and serve until the process is stopped.
pub async fn serve(
    host: impl AsRef<str>,
    port: u16,
    pipeline: OcrPipeline,
    options: RouterOptions,
) -> Result<(), GatewayError> {
    let ip: IpAddr = host
        .as_ref()
        .parse()
        .map_err(|e| GatewayError::InvalidConfig(format!("Invalid host address: {}", e)))?;

    let addr = SocketAddr::new(ip, port);
    let app = create_router(pipeline, options);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| GatewayError::Internal(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("OCR gateway listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| GatewayError::Internal(e.to_string()))?;

    Ok(())
}
