//! pixelsink daemon entry point.
//!
//! ```text
//! pixelsink-daemon                   Run with pixelsink.toml (or defaults)
//! pixelsink-daemon --config <path>   Load a custom config TOML
//! pixelsink-daemon --gen-config      Print the default config to stdout
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pixelsink_core::Pipeline;
use pixelsink_daemon::config::DaemonConfig;
use pixelsink_daemon::term::TerminalDriver;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "pixelsink-daemon",
    about = "UDP raster sink for RGB LED matrix panels"
)]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "pixelsink.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&DaemonConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let config = DaemonConfig::load(&cli.config);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let matrix = config.to_matrix_config();
    let options = config.to_lifecycle_options();

    info!("pixelsink-daemon v{}", env!("CARGO_PKG_VERSION"));
    info!("listen port: {}", config.network.listen_port);
    info!(
        "display geometry: {}x{} (chain {}, parallel {})",
        matrix.display_width(),
        matrix.display_height(),
        matrix.chain_length,
        matrix.parallel
    );
    info!(
        "lifecycle: acquire {:?}, {:?} after {}s idle",
        config.lifecycle.acquire, config.lifecycle.on_idle, config.lifecycle.idle_timeout_secs
    );

    let addr: SocketAddr = format!(
        "{}:{}",
        config.network.bind_address, config.network.listen_port
    )
    .parse()?;
    let pipeline = Pipeline::bind(addr, Box::new(TerminalDriver), matrix, options).await?;

    // Ctrl-C handler.
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
        ctrl_c.cancel();
    });

    pipeline.run(cancel).await?;

    Ok(())
}
