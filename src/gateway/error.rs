//! The single place where a [`GatewayError`] becomes an HTTP response.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::GatewayError;

use super::types::ErrorResponse;

/// An error ready to be sent to the client as `{"error": message}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Status code for each failure class.
pub fn status_for(err: &GatewayError) -> StatusCode {
    match err {
        GatewayError::EmptyUpload
        | GatewayError::MissingUpload
        | GatewayError::UnsupportedUpload { .. } => StatusCode::BAD_REQUEST,
        GatewayError::RasterizationFailed { .. } | GatewayError::NoPages => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        GatewayError::RasterizationUnavailable { .. }
        | GatewayError::ProviderNotConfigured { .. } => StatusCode::SERVICE_UNAVAILABLE,
        GatewayError::ProviderError { .. } | GatewayError::TransportError { .. } => {
            StatusCode::BAD_GATEWAY
        }
        GatewayError::ImageEncoding { .. }
        | GatewayError::InvalidConfig(_)
        | GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        let status = status_for(&err);
        if status.is_server_error() {
            tracing::error!("Request failed ({}): {}", status, err);
        } else {
            tracing::info!("Request rejected ({}): {}", status, err);
        }
        Self::new(status, err.user_message())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}
