//! Configuration types for the OCR gateway.
//!
//! Every knob is read once at startup into a [`GatewayConfig`], built via its
//! [`GatewayConfigBuilder`]. The binary fills the builder from CLI flags and
//! environment variables; tests use [`GatewayConfig::default()`] and override
//! what they need.

use crate::error::GatewayError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default Google Cloud Vision REST endpoint.
pub const DEFAULT_VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

/// Default vision-LLM model when the `llm` OCR provider is selected.
pub const DEFAULT_LLM_MODEL: &str = "gpt-4.1-nano";

/// Configuration for the OCR gateway.
///
/// # Example
/// ```rust
/// use ocr_gateway::GatewayConfig;
///
/// let config = GatewayConfig::builder()
///     .dpi(200)
///     .ocr_parallelism(4)
///     .vision_api_key("AIza...")
///     .build()
///     .unwrap();
/// assert_eq!(config.ocr_parallelism, 4);
/// ```
#[derive(Clone)]
pub struct GatewayConfig {
    /// Rendering DPI used when rasterising each PDF page. Range: 72–400. Default: 170.
    pub dpi: u32,

    /// Rendering-thread hint handed to the rasterizer. Default: 2.
    ///
    /// The poppler backend splits the page range into this many contiguous
    /// chunks and renders them with concurrent `pdftoppm` processes.
    pub render_threads: usize,

    /// Maximum OCR provider calls in flight for one PDF. Default: 3.
    pub ocr_parallelism: usize,

    /// Which rasterization backend to use. Default: [`RasterBackend::Poppler`].
    pub raster_backend: RasterBackend,

    /// Explicit backend directory (e.g. `POPPLER_PATH`). Wins over the search list.
    pub backend_path: Option<PathBuf>,

    /// Well-known directories probed for the backend when no explicit path is set.
    /// Empty means the backend's built-in list.
    pub backend_search_dirs: Vec<PathBuf>,

    /// Which OCR provider extracts text. Default: [`OcrProviderKind::GoogleVision`].
    pub ocr_provider: OcrProviderKind,

    /// Google Vision `images:annotate` endpoint.
    pub vision_endpoint: String,

    /// Google Vision API key, sent as the `key` query parameter.
    pub vision_api_key: Option<String>,

    /// OAuth2 access token, sent as a bearer token when no API key is set.
    /// With neither set, Application Default Credentials are used.
    pub vision_access_token: Option<String>,

    /// LLM provider name for the `llm` OCR provider (e.g. "openai", "gemini").
    /// If None, auto-detected from the environment.
    pub llm_provider: Option<String>,

    /// LLM model identifier for the `llm` OCR provider.
    pub llm_model: Option<String>,

    /// Per-request timeout for outbound OCR calls in seconds. Default: 60.
    pub request_timeout_secs: u64,

    /// Maximum accepted upload size in bytes. Default: 100 MB.
    pub max_upload_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            dpi: 170,
            render_threads: 2,
            ocr_parallelism: 3,
            raster_backend: RasterBackend::default(),
            backend_path: None,
            backend_search_dirs: Vec::new(),
            ocr_provider: OcrProviderKind::default(),
            vision_endpoint: DEFAULT_VISION_ENDPOINT.to_string(),
            vision_api_key: None,
            vision_access_token: None,
            llm_provider: None,
            llm_model: None,
            request_timeout_secs: 60,
            max_upload_bytes: 100 * 1024 * 1024,
        }
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("GatewayConfig")
            .field("dpi", &self.dpi)
            .field("render_threads", &self.render_threads)
            .field("ocr_parallelism", &self.ocr_parallelism)
            .field("raster_backend", &self.raster_backend)
            .field("backend_path", &self.backend_path)
            .field("backend_search_dirs", &self.backend_search_dirs)
            .field("ocr_provider", &self.ocr_provider)
            .field("vision_endpoint", &self.vision_endpoint)
            .field("vision_api_key", &redact(&self.vision_api_key))
            .field("vision_access_token", &redact(&self.vision_access_token))
            .field("llm_provider", &self.llm_provider)
            .field("llm_model", &self.llm_model)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

impl GatewayConfig {
    /// Create a new builder for `GatewayConfig`.
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder {
            config: Self::default(),
        }
    }

    /// Search list actually used for backend discovery.
    pub fn effective_search_dirs(&self) -> Vec<PathBuf> {
        if self.backend_search_dirs.is_empty() {
            self.raster_backend.default_search_dirs()
        } else {
            self.backend_search_dirs.clone()
        }
    }

    /// Resolve the rasterization backend directory.
    ///
    /// Call once at startup; the result is handed to the rasterizer.
    pub fn resolve_backend_path(&self) -> Option<PathBuf> {
        resolve_backend_path(
            &self.raster_backend.required_files(),
            self.backend_path.as_deref(),
            &self.effective_search_dirs(),
        )
    }
}

/// Pick the backend directory: explicit override, else the first search
/// directory containing every required file, else `None` (PATH lookup).
pub fn resolve_backend_path(
    required_files: &[String],
    explicit: Option<&Path>,
    search_dirs: &[PathBuf],
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    search_dirs
        .iter()
        .find(|dir| required_files.iter().all(|f| dir.join(f).exists()))
        .cloned()
}

/// Builder for [`GatewayConfig`].
#[derive(Debug)]
pub struct GatewayConfigBuilder {
    config: GatewayConfig,
}

impl GatewayConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn render_threads(mut self, n: usize) -> Self {
        self.config.render_threads = n.max(1);
        self
    }

    pub fn ocr_parallelism(mut self, n: usize) -> Self {
        self.config.ocr_parallelism = n.max(1);
        self
    }

    pub fn raster_backend(mut self, backend: RasterBackend) -> Self {
        self.config.raster_backend = backend;
        self
    }

    pub fn backend_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.backend_path = Some(path.into());
        self
    }

    pub fn backend_search_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.config.backend_search_dirs = dirs;
        self
    }

    pub fn ocr_provider(mut self, kind: OcrProviderKind) -> Self {
        self.config.ocr_provider = kind;
        self
    }

    pub fn vision_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.vision_endpoint = url.into();
        self
    }

    pub fn vision_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.vision_api_key = Some(key.into());
        self
    }

    pub fn vision_access_token(mut self, token: impl Into<String>) -> Self {
        self.config.vision_access_token = Some(token.into());
        self
    }

    pub fn llm_provider(mut self, name: impl Into<String>) -> Self {
        self.config.llm_provider = Some(name.into());
        self
    }

    pub fn llm_model(mut self, model: impl Into<String>) -> Self {
        self.config.llm_model = Some(model.into());
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GatewayConfig, GatewayError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(GatewayError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        if c.ocr_parallelism == 0 || c.render_threads == 0 {
            return Err(GatewayError::InvalidConfig(
                "OCR parallelism and render threads must be ≥ 1".into(),
            ));
        }
        if c.request_timeout_secs == 0 {
            return Err(GatewayError::InvalidConfig(
                "Request timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_upload_bytes == 0 {
            return Err(GatewayError::InvalidConfig(
                "Upload limit must be > 0 bytes".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// PDF rasterization backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterBackend {
    /// poppler-utils binaries (`pdfinfo` + `pdftoppm`) run as subprocesses. (default)
    #[default]
    Poppler,
    /// In-process rendering through a dynamically bound libpdfium.
    Pdfium,
}

impl RasterBackend {
    pub fn name(&self) -> &'static str {
        match self {
            RasterBackend::Poppler => "poppler",
            RasterBackend::Pdfium => "pdfium",
        }
    }

    /// Files that must all be present for a directory to count as a backend home.
    pub fn required_files(&self) -> Vec<String> {
        match self {
            RasterBackend::Poppler => vec![
                format!("pdfinfo{}", std::env::consts::EXE_SUFFIX),
                format!("pdftoppm{}", std::env::consts::EXE_SUFFIX),
            ],
            RasterBackend::Pdfium => vec![format!(
                "{}pdfium{}",
                std::env::consts::DLL_PREFIX,
                std::env::consts::DLL_SUFFIX
            )],
        }
    }

    /// Well-known installation directories probed when no path is configured.
    pub fn default_search_dirs(&self) -> Vec<PathBuf> {
        let dirs: &[&str] = match self {
            RasterBackend::Poppler => &["/opt/homebrew/bin", "/usr/local/bin", "/opt/local/bin"],
            RasterBackend::Pdfium => &["/opt/homebrew/lib", "/usr/local/lib", "/usr/lib"],
        };
        dirs.iter().map(PathBuf::from).collect()
    }
}

/// OCR provider used by the text extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OcrProviderKind {
    /// Google Cloud Vision `DOCUMENT_TEXT_DETECTION`. (default)
    #[default]
    GoogleVision,
    /// A vision-capable LLM asked for a verbatim transcription.
    Llm,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_service_defaults() {
        let c = GatewayConfig::default();
        assert_eq!(c.dpi, 170);
        assert_eq!(c.render_threads, 2);
        assert_eq!(c.ocr_parallelism, 3);
        assert_eq!(c.raster_backend, RasterBackend::Poppler);
        assert_eq!(c.vision_endpoint, DEFAULT_VISION_ENDPOINT);
    }

    #[test]
    fn builder_clamps_out_of_range_values() {
        let c = GatewayConfig::builder()
            .dpi(10)
            .ocr_parallelism(0)
            .render_threads(0)
            .build()
            .unwrap();
        assert_eq!(c.dpi, 72);
        assert_eq!(c.ocr_parallelism, 1);
        assert_eq!(c.render_threads, 1);
    }

    #[test]
    fn build_rejects_zero_timeout() {
        let err = GatewayConfig::builder()
            .request_timeout_secs(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidConfig(_)));
    }

    #[test]
    fn debug_redacts_credentials() {
        let c = GatewayConfig::builder()
            .vision_api_key("super-secret")
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("super-secret"), "got: {dbg}");
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn explicit_backend_path_wins() {
        let dir = TempDir::new().unwrap();
        let explicit = PathBuf::from("/custom/poppler/bin");
        let found = resolve_backend_path(
            &RasterBackend::Poppler.required_files(),
            Some(&explicit),
            &[dir.path().to_path_buf()],
        );
        assert_eq!(found, Some(explicit));
    }

    #[test]
    fn first_directory_with_all_binaries_is_chosen() {
        let partial = TempDir::new().unwrap();
        let complete = TempDir::new().unwrap();
        let also_complete = TempDir::new().unwrap();
        let files = RasterBackend::Poppler.required_files();

        std::fs::write(partial.path().join(&files[0]), b"").unwrap();
        for dir in [&complete, &also_complete] {
            for f in &files {
                std::fs::write(dir.path().join(f), b"").unwrap();
            }
        }

        let search = vec![
            partial.path().to_path_buf(),
            complete.path().to_path_buf(),
            also_complete.path().to_path_buf(),
        ];
        let found = resolve_backend_path(&files, None, &search);
        assert_eq!(found.as_deref(), Some(complete.path()));
    }

    #[test]
    fn no_match_leaves_path_unset() {
        let empty = TempDir::new().unwrap();
        let found = resolve_backend_path(
            &RasterBackend::Pdfium.required_files(),
            None,
            &[empty.path().to_path_buf()],
        );
        assert_eq!(found, None);
    }

    #[test]
    fn custom_search_dirs_replace_defaults() {
        let c = GatewayConfig::builder()
            .backend_search_dirs(vec![PathBuf::from("/srv/poppler")])
            .build()
            .unwrap();
        assert_eq!(c.effective_search_dirs(), vec![PathBuf::from("/srv/poppler")]);
        assert_eq!(
            GatewayConfig::default().effective_search_dirs().len(),
            3
        );
    }
}
