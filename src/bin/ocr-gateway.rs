//! HTTP server binary for ocr-gateway.
//!
//! A thin shim over the library crate that maps CLI flags and environment
//! variables to `GatewayConfig`, builds the pipeline, and serves the router.

use anyhow::{Context, Result};
use clap::Parser;
use ocr_gateway::gateway::{serve, RouterOptions};
use ocr_gateway::{GatewayConfig, OcrPipeline, OcrProviderKind, RasterBackend};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"ENDPOINTS:
  GET  /health          {"ok": true}
  POST /ocr             multipart field "file" (image or PDF) -> {"text": "..."}
  POST /pdf-to-images   multipart field "file" (PDF) -> {"images": [...], "pageCount": n}

EXAMPLES:
  GOOGLE_VISION_API_KEY=AIza... ocr-gateway
  GOOGLE_APPLICATION_CREDENTIALS=sa.json ocr-gateway
  ocr-gateway --port 9000 --dpi 200 --parallelism 6
  ocr-gateway --ocr-provider llm --llm-provider openai --model gpt-4.1-mini
  curl -F "file=@scan.pdf" http://localhost:8001/ocr

RASTERIZATION:
  The default backend runs poppler's pdfinfo/pdftoppm. Install poppler
  (brew install poppler / apt install poppler-utils) or point POPPLER_PATH
  at the directory holding both binaries. --raster-backend pdfium binds a
  libpdfium shared library instead.
"#;

/// Extract text from uploaded images and PDFs over HTTP.
#[derive(Parser, Debug)]
#[command(
    name = "ocr-gateway",
    version,
    about = "HTTP gateway that extracts text from uploaded images and PDFs",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Address to bind.
    #[arg(long, env = "OCR_GATEWAY_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on.
    #[arg(long, env = "OCR_GATEWAY_PORT", default_value_t = 8001)]
    port: u16,

    /// Rendering DPI for PDF pages (72–400).
    #[arg(long, env = "OCR_PDF_DPI", default_value_t = 170,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Rasterizer concurrency hint (concurrent pdftoppm processes).
    #[arg(long, env = "OCR_PDF_THREAD_COUNT", default_value_t = 2)]
    render_threads: usize,

    /// Maximum concurrent OCR calls per PDF.
    #[arg(long, env = "OCR_PARALLELISM", default_value_t = 3)]
    parallelism: usize,

    /// PDF rasterization backend.
    #[arg(long, env = "OCR_RASTER_BACKEND", value_enum, default_value = "poppler")]
    raster_backend: RasterArg,

    /// Directory holding the backend binaries or library.
    #[arg(long, env = "POPPLER_PATH")]
    backend_path: Option<PathBuf>,

    /// Comma-separated directories probed for the backend when no path is set.
    #[arg(long, env = "OCR_BACKEND_SEARCH_DIRS", value_delimiter = ',')]
    backend_search_dirs: Vec<PathBuf>,

    /// OCR provider.
    #[arg(long, env = "OCR_PROVIDER", value_enum, default_value = "google-vision")]
    ocr_provider: ProviderArg,

    /// Google Vision images:annotate endpoint.
    #[arg(long, env = "GOOGLE_VISION_ENDPOINT")]
    vision_endpoint: Option<String>,

    /// Google Vision API key.
    #[arg(long, env = "GOOGLE_VISION_API_KEY", hide_env_values = true)]
    vision_api_key: Option<String>,

    /// OAuth2 access token for Google Vision (used when no API key is set).
    #[arg(long, env = "GOOGLE_VISION_ACCESS_TOKEN", hide_env_values = true)]
    vision_access_token: Option<String>,

    /// LLM provider for --ocr-provider llm: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_LLM_PROVIDER")]
    llm_provider: Option<String>,

    /// Vision LLM model ID for --ocr-provider llm.
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// Timeout for each outbound OCR call, in seconds.
    #[arg(long, env = "OCR_REQUEST_TIMEOUT_SECS", default_value_t = 60)]
    request_timeout: u64,

    /// Maximum upload size in megabytes.
    #[arg(long, env = "OCR_MAX_UPLOAD_MB", default_value_t = 100)]
    max_upload_mb: usize,

    /// Comma-separated allowed CORS origins (default: any).
    #[arg(long, env = "OCR_CORS_ORIGINS")]
    cors_origins: Option<String>,

    /// Debug logging.
    #[arg(short, long, env = "OCR_VERBOSE")]
    verbose: bool,

    /// Errors only.
    #[arg(short, long, env = "OCR_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum RasterArg {
    Poppler,
    Pdfium,
}

impl From<RasterArg> for RasterBackend {
    fn from(v: RasterArg) -> Self {
        match v {
            RasterArg::Poppler => RasterBackend::Poppler,
            RasterArg::Pdfium => RasterBackend::Pdfium,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ProviderArg {
    GoogleVision,
    Llm,
}

impl From<ProviderArg> for OcrProviderKind {
    fn from(v: ProviderArg) -> Self {
        match v {
            ProviderArg::GoogleVision => OcrProviderKind::GoogleVision,
            ProviderArg::Llm => OcrProviderKind::Llm,
        }
    }
}

fn build_config(cli: &Cli) -> Result<GatewayConfig> {
    let mut builder = GatewayConfig::builder()
        .dpi(cli.dpi)
        .render_threads(cli.render_threads)
        .ocr_parallelism(cli.parallelism)
        .raster_backend(cli.raster_backend.into())
        .backend_search_dirs(cli.backend_search_dirs.clone())
        .ocr_provider(cli.ocr_provider.into())
        .request_timeout_secs(cli.request_timeout)
        .max_upload_bytes(cli.max_upload_mb.saturating_mul(1024 * 1024));

    if let Some(ref path) = cli.backend_path {
        builder = builder.backend_path(path);
    }
    if let Some(ref url) = cli.vision_endpoint {
        builder = builder.vision_endpoint(url);
    }
    if let Some(ref key) = cli.vision_api_key {
        builder = builder.vision_api_key(key);
    }
    if let Some(ref token) = cli.vision_access_token {
        builder = builder.vision_access_token(token);
    }
    if let Some(ref name) = cli.llm_provider {
        builder = builder.llm_provider(name);
    }
    if let Some(ref model) = cli.model {
        builder = builder.llm_model(model);
    }

    builder.build().context("Invalid configuration")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config + pipeline ──────────────────────────────────────────
    let config = build_config(&cli)?;
    tracing::debug!("{:?}", config);

    let pipeline =
        OcrPipeline::from_config(&config).context("Failed to initialise the OCR provider")?;

    let mut options = RouterOptions::from_config(&config);
    if let Some(ref origins) = cli.cors_origins {
        options = options.with_cors_origins(origins);
    }

    // ── Serve ────────────────────────────────────────────────────────────
    serve(&cli.host, cli.port, pipeline, options)
        .await
        .context("Server terminated")?;

    Ok(())
}
