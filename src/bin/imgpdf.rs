//! `imgpdf`: HTTP server that turns uploaded JPEGs into one PDF.

use anyhow::{Context, Result};
use clap::Parser;
use imgpdf::server::{self, AppState};
use imgpdf::ServerConfig;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"ENDPOINTS:
  POST /upload          multipart field "file" (.jpg / .jpeg)
  GET  /uploads/{name}  stored image bytes
  POST /remove-file     {"file": "<name>"}
  POST /preview-size    {"files": [...], "compression": "none|low|medium|high"}
  POST /convert         {"files": [...], "compression": ..., "pageSize": "A4",
                         "orientation": "portrait", "margins": 20}

EXAMPLES:
  # Serve on the default port with uploads in ./uploads
  imgpdf

  # Custom directory, 32 MiB bodies, sweep uploads older than an hour
  imgpdf --upload-dir /var/tmp/imgpdf --max-body 33554432 --sweep-after 3600

  # Honour pageSize / orientation / margins instead of sizing pages from the image
  imgpdf --apply-page-layout
"#;

/// Serve the JPEG-to-PDF conversion API.
#[derive(Parser, Debug)]
#[command(
    name = "imgpdf",
    version,
    about = "Upload JPEG images and merge them into one PDF over HTTP",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Address to bind.
    #[arg(long, env = "IMGPDF_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on.
    #[arg(short, long, env = "IMGPDF_PORT", default_value_t = 8080)]
    port: u16,

    /// Directory for uploaded images (created if missing).
    #[arg(long, env = "IMGPDF_UPLOAD_DIR", default_value = "uploads")]
    upload_dir: PathBuf,

    /// Maximum request body size in bytes.
    #[arg(long, env = "IMGPDF_MAX_BODY", default_value_t = imgpdf::config::DEFAULT_MAX_BODY_BYTES)]
    max_body: usize,

    /// DPI used to size pages from image pixels (72–1200).
    #[arg(long, env = "IMGPDF_DPI", default_value_t = imgpdf::config::DEFAULT_DPI,
          value_parser = clap::value_parser!(u32).range(72..=1200))]
    dpi: u32,

    /// Apply the requested page size, orientation and margins.
    #[arg(long, env = "IMGPDF_APPLY_LAYOUT")]
    apply_page_layout: bool,

    /// Delete uploads older than this many seconds. Off by default.
    #[arg(long, env = "IMGPDF_SWEEP_AFTER",
          value_parser = clap::value_parser!(u64).range(1..))]
    sweep_after: Option<u64>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "IMGPDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "IMGPDF_QUIET")]
    quiet: bool,
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

    // ── Build config ─────────────────────────────────────────────────────
    let config = build_config(&cli)?;
    info!(
        "Config: upload_dir={} max_body={} dpi={} apply_page_layout={} sweep_after={:?}",
        config.upload_dir.display(),
        config.max_body_bytes,
        config.dpi,
        config.apply_page_layout,
        config.sweep_after
    );

    let state = AppState::init(config)
        .await
        .context("Failed to prepare upload directory")?;

    // ── Serve ────────────────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind((cli.host.as_str(), cli.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", cli.host, cli.port))?;

    server::serve(listener, state, shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shut down cleanly");
    Ok(())
}

/// Map CLI args to `ServerConfig`.
fn build_config(cli: &Cli) -> Result<ServerConfig> {
    ServerConfig::builder()
        .upload_dir(cli.upload_dir.clone())
        .max_body_bytes(cli.max_body)
        .dpi(cli.dpi)
        .apply_page_layout(cli.apply_page_layout)
        .sweep_after(cli.sweep_after.map(Duration::from_secs))
        .build()
        .context("Invalid configuration")
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Ctrl-C received, draining connections");
    }
}
