//! beam viewer — entry point.
//!
//! ```text
//! beam-viewer                    Run with defaults
//! beam-viewer --config <path>   Load a custom config TOML
//! beam-viewer --gen-config      Write default config to stdout
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use beam_viewer::config::ViewerConfig;
use beam_viewer::service::ViewerService;
use beam_viewer::sink::LoggingFrameSink;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "beam-viewer", about = "beam screen consumer")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "beam-viewer.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&ViewerConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    // Load config.
    let config = ViewerConfig::load(&cli.config);

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("beam-viewer v{}", env!("CARGO_PKG_VERSION"));
    info!("relay address: {}", config.relay.address);

    let mut sink = LoggingFrameSink::new();
    if !config.display.save_path.is_empty() {
        info!("mirroring frames to {}", config.display.save_path);
        sink = sink.with_save_path(PathBuf::from(&config.display.save_path));
    }

    let mut service = ViewerService::new(config, sink);
    let stop = service.stop_handle();

    // Ctrl-C handler.
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received — shutting down");
        stop.store(false, std::sync::atomic::Ordering::SeqCst);
    });

    service.run().await?;

    Ok(())
}
