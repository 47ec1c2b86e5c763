//! beam host — entry point.
//!
//! ```text
//! beam-host                      Run with defaults
//! beam-host --config <path>     Load a custom config TOML
//! beam-host --gen-config        Write default config to stdout
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use beam_host::config::HostConfig;
use beam_host::input::LoggingInputSink;
use beam_host::service::HostService;
use beam_host::source::TestPatternSource;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "beam-host", about = "beam screen producer")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "beam-host.toml")]
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
        let text = toml::to_string_pretty(&HostConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    // Load config.
    let config = HostConfig::load(&cli.config);

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("beam-host v{}", env!("CARGO_PKG_VERSION"));
    info!("relay address: {}", config.relay.address);
    info!(
        "capture surface: {}x{}",
        config.capture.width, config.capture.height
    );
    info!("submit mode: {:?}", config.submit_mode());

    let source = TestPatternSource::new(config.capture.width, config.capture.height);
    let mut service = HostService::new(config, source, LoggingInputSink::new());
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
