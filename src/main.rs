use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};

use feedreader::rss::{start_rss_updater, Ingestor, RssFetcher};
use feedreader::web::WebServer;
use feedreader::{Config, Database, Result};

/// Command-line arguments for feedreader
#[derive(Parser, Debug)]
#[command(name = "feedreader")]
#[command(about = "Personal RSS/Atom feed reader")]
#[command(version)]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = "config.toml", env = "FEEDREADER_CONFIG")]
    config: PathBuf,

    /// Host address to bind (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let (mut config, load_error) = match Config::load_with_env(&args.config) {
        Ok(config) => (config, None),
        Err(e) => {
            let mut config = Config::default();
            config.apply_env_overrides();
            (config, Some(e))
        }
    };

    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.debug {
        config.logging.level = "debug".to_string();
    }

    // Initialize logging
    if let Err(e) = feedreader::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        feedreader::logging::init_console_only(&config.logging.level);
    }

    if let Some(e) = load_error {
        warn!(
            "Failed to load {}: {}. Using default configuration.",
            args.config.display(),
            e
        );
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Fatal error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<()> {
    config.validate()?;

    info!("feedreader {}", env!("CARGO_PKG_VERSION"));

    let db = Arc::new(Database::open(&config.database.path).await?);
    let fetcher = Arc::new(RssFetcher::new(&config.rss)?);
    let ingestor = Arc::new(Ingestor::new(
        db.clone(),
        fetcher,
        config.rss.refresh_concurrency,
    ));

    let updater = if config.rss.enabled {
        Some(start_rss_updater(
            ingestor.clone(),
            config.rss.update_interval_secs,
        ))
    } else {
        info!("Periodic refresh disabled");
        None
    };

    let server = WebServer::new(&config, ingestor)?;
    server.run(shutdown_signal()).await?;

    if let Some(updater) = updater {
        updater.abort();
    }
    db.close().await;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
