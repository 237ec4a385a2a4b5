use std::path::Path;

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const LOG_FILE_PREFIX: &str = "csw-discovery.log";

/// The default filter for a `-v` count.
///
/// `RUST_LOG` takes precedence when set.
pub fn log_filter(verbosity: u8) -> &'static str {
    match verbosity {
        // Only show warnings
        0 => "off,csw_discovery=warn,csw_catalog=warn",
        // Show our own info logs
        1 => "off,csw_discovery=info,csw_catalog=info",
        2 => "off,csw_discovery=debug,csw_catalog=debug",
        3 => "off,csw_discovery=trace,csw_catalog=trace",
        // Also show logs of the http stack
        4 => "debug,csw_discovery=trace,csw_catalog=trace",
        _ => "trace",
    }
}

fn env_filter(verbosity: u8) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_filter(verbosity)))
        .context("invalid log filter")
}

/// Initializes a logger writing to `stderr` and, if given, to a daily
/// rolling file in `log_dir`.
pub fn init_logger(verbosity: u8, log_dir: Option<&Path>) -> Result<()> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(env_filter(verbosity)?);
    let file_layer = match log_dir {
        Some(dir_path) => {
            let appender = tracing_appender::rolling::daily(dir_path, LOG_FILE_PREFIX);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(appender)
                    .with_filter(env_filter(verbosity)?),
            )
        },
        None => None,
    };
    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("failed to initialize logger")?;
    Ok(())
}
