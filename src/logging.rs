//! Logging setup.
//!
//! The configured level applies to this crate; `RUST_LOG`, when set, replaces
//! the whole filter. Chatty dependencies are capped at `warn` by default.

use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::{ReaderError, Result};

const QUIET_DEPENDENCIES: &[&str] = &["sqlx", "hyper", "hyper_util", "reqwest", "html5ever"];

fn parse_level(level: &str) -> Level {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Filter directives for a configured level, without consulting the
/// environment.
fn default_directives(level: &str) -> String {
    let level = parse_level(level);
    let mut directives = vec![level.to_string().to_lowercase()];
    for target in QUIET_DEPENDENCIES {
        directives.push(format!("{}=warn", target));
    }
    directives.join(",")
}

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

/// Install the global subscriber.
///
/// Logs go to stdout, and are also appended to `config.file` when set.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let Some(path) = config.file.as_deref() else {
        init_console_only(&config.level);
        return Ok(());
    };

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let log_file = Arc::new(File::options().create(true).append(true).open(path)?);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout.and(log_file))
                .with_ansi(false)
                .with_target(true),
        )
        .with(build_filter(&config.level))
        .try_init()
        .map_err(|e| ReaderError::Config(format!("failed to install logger: {}", e)))
}

/// Install a stdout-only subscriber. Does nothing if one is already set.
pub fn init_console_only(level: &str) {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(build_filter(level))
        .try_init();
}
