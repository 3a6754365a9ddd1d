//! rds-backend entry point.
//!
//! ```text
//! rds-backend                          Run with rds-backend.toml
//! rds-backend --config <path>          Load a custom config TOML
//! rds-backend --gen-config             Write default config to stdout
//! rds-backend --width 1280 --height 720 --depth 32
//! rds-backend --no-keypad-cursors      Rewrite keypad arrows to cursor keys
//! ```

use std::path::PathBuf;
use std::sync::Mutex;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rds_backend::config::BackendConfig;
use rds_backend::service::BackendService;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "rds-backend", about = "Remote-session display backend")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "rds-backend.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Initial framebuffer width.
    #[arg(long)]
    width: Option<u32>,

    /// Initial framebuffer height.
    #[arg(long)]
    height: Option<u32>,

    /// Colour depth (8, 15, 16, 24 or 32).
    #[arg(long)]
    depth: Option<u32>,

    /// Rewrite keypad navigation keys to the cursor block.
    #[arg(long)]
    no_keypad_cursors: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&BackendConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = BackendConfig::load(&cli.config);
    if let Some(width) = cli.width {
        config.display.width = width;
    }
    if let Some(height) = cli.height {
        config.display.height = height;
    }
    if let Some(depth) = cli.depth {
        config.display.depth = depth;
    }
    if cli.no_keypad_cursors {
        config.input.keypad_cursors = false;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    if config.logging.file.is_empty() {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    } else {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.logging.file)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }

    info!("rds-backend v{}", env!("CARGO_PKG_VERSION"));
    info!("listen address: {}", config.network.listen_addr);
    info!(
        "framebuffer: {}x{}x{}",
        config.display.width, config.display.height, config.display.depth
    );

    let service = BackendService::new(config);
    let stop = service.stop_handle();

    // Ctrl-C handler.
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
        stop.store(false, std::sync::atomic::Ordering::SeqCst);
    });

    service.run().await?;

    Ok(())
}
