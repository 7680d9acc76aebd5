//! Google Cloud Vision OCR over the `images:annotate` REST endpoint.
//!
//! Each call asks for `DOCUMENT_TEXT_DETECTION`, the mode tuned for dense,
//! page-style text. Text is taken from the response in a fixed order:
//!
//! 1. `fullTextAnnotation.text` (the structured full-page text), trimmed;
//! 2. else `textAnnotations[0].description` (the first raw annotation,
//!    which the API fills with the whole detected text), trimmed;
//! 3. else the empty string.
//!
//! A per-image `error.message` short-circuits all of this with
//! [`GatewayError::ProviderError`].
//!
//! Credentials, in order of preference: an API key, a fixed bearer token, or
//! Application Default Credentials (`GOOGLE_APPLICATION_CREDENTIALS`, the
//! gcloud user config, or the metadata server) resolved through `gcp_auth`.

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::extract::TextExtractor;

const FEATURE_DOCUMENT_TEXT: &str = "DOCUMENT_TEXT_DETECTION";

/// OAuth scope requested for Application Default Credentials.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Supplies a fresh bearer token for each Vision API call.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, GatewayError>;
}

/// How requests authenticate against the Vision API.
#[derive(Clone)]
pub enum VisionAuth {
    /// Appended as the `key` query parameter.
    ApiKey(String),
    /// Sent as `Authorization: Bearer …`.
    Bearer(String),
    /// Bearer token fetched per request; tokens are cached and refreshed by
    /// the source.
    TokenSource(Arc<dyn AccessTokenSource>),
}

impl VisionAuth {
    pub fn mode(&self) -> &'static str {
        match self {
            VisionAuth::ApiKey(_) => "api-key",
            VisionAuth::Bearer(_) => "access-token",
            VisionAuth::TokenSource(_) => "token-source",
        }
    }
}

/// Application Default Credentials via `gcp_auth`.
///
/// The provider is discovered on the first request and reused afterwards;
/// a failed discovery is retried on the next request.
#[derive(Default)]
pub struct ApplicationDefaultCredentials {
    provider: tokio::sync::OnceCell<Arc<dyn gcp_auth::TokenProvider>>,
}

impl ApplicationDefaultCredentials {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccessTokenSource for ApplicationDefaultCredentials {
    async fn access_token(&self) -> Result<String, GatewayError> {
        let provider = self
            .provider
            .get_or_try_init(|| async {
                let provider = gcp_auth::provider().await.map_err(|e| {
                    GatewayError::ProviderNotConfigured {
                        provider: "google-vision".into(),
                        hint: format!(
                            "Set GOOGLE_VISION_API_KEY or GOOGLE_VISION_ACCESS_TOKEN, \
                             or configure Application Default Credentials ({}).",
                            e
                        ),
                    }
                })?;
                info!("Vision API: using Application Default Credentials");
                Ok::<_, GatewayError>(provider)
            })
            .await?;

        let token = provider
            .token(&[CLOUD_PLATFORM_SCOPE])
            .await
            .map_err(|e| GatewayError::TransportError {
                detail: format!("could not obtain Google access token: {}", e),
            })?;
        Ok(token.as_str().to_string())
    }
}

/// Text extractor backed by Google Cloud Vision.
///
/// The HTTP client is built on the first call and shared by every call
/// after it; the extractor itself is shared across requests behind an `Arc`.
pub struct GoogleVisionExtractor {
    endpoint: String,
    auth: VisionAuth,
    timeout: Duration,
    client: OnceCell<reqwest::Client>,
}

impl GoogleVisionExtractor {
    pub fn new(endpoint: impl Into<String>, auth: VisionAuth, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            auth,
            timeout,
            client: OnceCell::new(),
        }
    }

    /// Pick credentials from the config, falling back to Application Default
    /// Credentials when neither a key nor a token is set.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let auth = match (&config.vision_api_key, &config.vision_access_token) {
            (Some(key), _) if !key.is_empty() => VisionAuth::ApiKey(key.clone()),
            (_, Some(token)) if !token.is_empty() => VisionAuth::Bearer(token.clone()),
            _ => VisionAuth::TokenSource(Arc::new(ApplicationDefaultCredentials::new())),
        };
        debug!("Vision API auth mode: {}", auth.mode());

        Ok(Self::new(
            config.vision_endpoint.clone(),
            auth,
            Duration::from_secs(config.request_timeout_secs),
        ))
    }

    pub fn auth_mode(&self) -> &'static str {
        self.auth.mode()
    }

    fn client(&self) -> Result<&reqwest::Client, GatewayError> {
        self.client.get_or_try_init(|| {
            debug!("Creating Vision API client (timeout {:?})", self.timeout);
            reqwest::Client::builder()
                .timeout(self.timeout)
                .build()
                .map_err(|e| GatewayError::TransportError {
                    detail: format!("could not build HTTP client: {}", e),
                })
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> GatewayError {
        let detail = if e.is_timeout() {
            format!("Vision API call timed out after {}s", self.timeout.as_secs())
        } else {
            e.to_string()
        };
        GatewayError::TransportError { detail }
    }
}

#[async_trait]
impl TextExtractor for GoogleVisionExtractor {
    fn provider(&self) -> &str {
        "google-vision"
    }

    async fn extract(&self, image: &[u8]) -> Result<String, GatewayError> {
        let request = AnnotateRequest {
            requests: [AnnotateImageRequest {
                image: ImageContent {
                    content: STANDARD.encode(image),
                },
                features: [Feature {
                    kind: FEATURE_DOCUMENT_TEXT,
                }],
            }],
        };

        let mut builder = self.client()?.post(&self.endpoint).json(&request);
        builder = match &self.auth {
            VisionAuth::ApiKey(key) => builder.query(&[("key", key.as_str())]),
            VisionAuth::Bearer(token) => builder.bearer_auth(token),
            VisionAuth::TokenSource(source) => builder.bearer_auth(source.access_token().await?),
        };

        let response = builder.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            if let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(&body) {
                if !envelope.error.message.is_empty() {
                    warn!("Vision API returned HTTP {}: {}", status, envelope.error.message);
                    return Err(GatewayError::ProviderError {
                        message: envelope.error.message,
                    });
                }
            }
            return Err(GatewayError::TransportError {
                detail: format!("Vision API returned HTTP {}", status),
            });
        }

        let parsed: AnnotateResponse =
            serde_json::from_slice(&body).map_err(|e| GatewayError::TransportError {
                detail: format!("invalid Vision API response: {}", e),
            })?;

        let first = parsed.responses.into_iter().next().unwrap_or_default();
        let text = select_text(&first)?;
        debug!("Vision API: {} chars", text.len());
        Ok(text)
    }
}

/// Apply the error check and the text fallback order to one image response.
pub fn select_text(response: &AnnotateImageResponse) -> Result<String, GatewayError> {
    if let Some(status) = &response.error {
        if !status.message.is_empty() {
            return Err(GatewayError::ProviderError {
                message: status.message.clone(),
            });
        }
    }

    let full_text = response
        .full_text_annotation
        .as_ref()
        .map(|a| a.text.trim())
        .unwrap_or("");
    if !full_text.is_empty() {
        return Ok(full_text.to_string());
    }

    let first = response
        .text_annotations
        .first()
        .map(|a| a.description.trim())
        .unwrap_or("");
    Ok(first.to_string())
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct AnnotateRequest<'a> {
    requests: [AnnotateImageRequest<'a>; 1],
}

#[derive(Serialize)]
struct AnnotateImageRequest<'a> {
    image: ImageContent,
    features: [Feature<'a>; 1],
}

#[derive(Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Serialize)]
struct Feature<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

/// Top-level `images:annotate` response.
#[derive(Debug, Default, Deserialize)]
pub struct AnnotateResponse {
    #[serde(default)]
    pub responses: Vec<AnnotateImageResponse>,
}

/// The subset of `AnnotateImageResponse` the gateway reads.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotateImageResponse {
    #[serde(default)]
    pub full_text_annotation: Option<FullTextAnnotation>,
    #[serde(default)]
    pub text_annotations: Vec<EntityAnnotation>,
    #[serde(default)]
    pub error: Option<Status>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FullTextAnnotation {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct EntityAnnotation {
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Status,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> AnnotateImageResponse {
        let resp: AnnotateResponse = serde_json::from_str(json).expect("valid json");
        resp.responses.into_iter().next().unwrap_or_default()
    }

    #[test]
    fn full_text_wins() {
        let r = parse(
            r#"{"responses":[{
                "fullTextAnnotation":{"text":"  Dear diary,\nToday...\n"},
                "textAnnotations":[{"description":"something else"}]
            }]}"#,
        );
        assert_eq!(select_text(&r).unwrap(), "Dear diary,\nToday...");
    }

    #[test]
    fn falls_back_to_first_annotation() {
        let r = parse(
            r#"{"responses":[{
                "fullTextAnnotation":{"text":"   "},
                "textAnnotations":[{"description":" STOP \n"},{"description":"STOP"}]
            }]}"#,
        );
        assert_eq!(select_text(&r).unwrap(), "STOP");
    }

    #[test]
    fn nothing_found_is_empty_not_error() {
        assert_eq!(select_text(&parse(r#"{"responses":[{}]}"#)).unwrap(), "");
        assert_eq!(select_text(&parse(r#"{"responses":[]}"#)).unwrap(), "");
        assert_eq!(select_text(&parse(r#"{}"#)).unwrap(), "");
    }

    #[test]
    fn provider_error_short_circuits() {
        let r = parse(
            r#"{"responses":[{
                "error":{"code":3,"message":"Bad image data."},
                "fullTextAnnotation":{"text":"ignored"}
            }]}"#,
        );
        let err = select_text(&r).unwrap_err();
        assert!(matches!(err, GatewayError::ProviderError { ref message } if message == "Bad image data."));
    }

    #[test]
    fn request_body_shape() {
        let request = AnnotateRequest {
            requests: [AnnotateImageRequest {
                image: ImageContent {
                    content: "AAAA".into(),
                },
                features: [Feature {
                    kind: FEATURE_DOCUMENT_TEXT,
                }],
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["requests"][0]["image"]["content"], "AAAA");
        assert_eq!(
            json["requests"][0]["features"][0]["type"],
            "DOCUMENT_TEXT_DETECTION"
        );
    }

    #[test]
    fn missing_credentials_fall_back_to_default_credentials() {
        let extractor = GoogleVisionExtractor::from_config(&GatewayConfig::default()).unwrap();
        assert_eq!(extractor.auth_mode(), "token-source");
    }

    #[test]
    fn explicit_credentials_take_precedence() {
        let both = GatewayConfig {
            vision_api_key: Some("k".into()),
            vision_access_token: Some("t".into()),
            ..GatewayConfig::default()
        };
        assert_eq!(
            GoogleVisionExtractor::from_config(&both).unwrap().auth_mode(),
            "api-key"
        );

        let token_only = GatewayConfig {
            vision_api_key: Some(String::new()),
            vision_access_token: Some("t".into()),
            ..GatewayConfig::default()
        };
        assert_eq!(
            GoogleVisionExtractor::from_config(&token_only).unwrap().auth_mode(),
            "access-token"
        );
    }

    #[test]
    fn client_is_constructed_once() {
        let extractor = GoogleVisionExtractor::new(
            "http://127.0.0.1:9/annotate",
            VisionAuth::ApiKey("k".into()),
            Duration::from_secs(5),
        );
        let a = extractor.client().unwrap() as *const reqwest::Client;
        let b = extractor.client().unwrap() as *const reqwest::Client;
        assert_eq!(a, b);
    }
}
