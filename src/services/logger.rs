use std::fs;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use super::platform;
use crate::config::ServerConfig;

/// Crates whose debug output drowns the server's own logs.
const QUIET_CRATES: &str = "reqwest=warn,hyper=warn,hyper_util=warn,rustls=warn,mio=warn";

/// Initialize the structured logging system.
///
/// Sets up:
/// - File output: `mcp-server.<date>.log` in the platform log directory,
///   rotated daily.
/// - Console output on stderr. Stdout carries JSON-RPC and is never logged to.
/// - Environment filter: `RUST_LOG` when set, otherwise the configured level.
///
/// If the log directory or file appender cannot be created, logging continues
/// on stderr only.
pub fn init(config: &ServerConfig) -> Result<(), String> {
    let log_dir = platform::get_log_dir();

    let file_appender = fs::create_dir_all(&log_dir)
        .map_err(|e| e.to_string())
        .and_then(|_| {
            RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("mcp-server")
                .filename_suffix("log")
                .build(&log_dir)
                .map_err(|e| e.to_string())
        });

    let file_error = file_appender.as_ref().err().cloned();
    let file_layer = file_appender.ok().map(|appender| {
        fmt::layer()
            .with_writer(appender)
            .with_ansi(false)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    });

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .compact();

    tracing_subscriber::registry()
        .with(build_filter(&config.log_level))
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| format!("Logger already initialized: {}", e))?;

    match file_error {
        None => tracing::info!(log_dir = %log_dir.display(), "Logger initialized"),
        Some(e) => tracing::warn!(
            log_dir = %log_dir.display(),
            "File logging unavailable, using stderr only: {}",
            e
        ),
    }
    Ok(())
}

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| filter_for_level(level))
}

fn filter_for_level(level: &str) -> EnvFilter {
    EnvFilter::try_new(format!("{},{}", level, QUIET_CRATES))
        .unwrap_or_else(|_| EnvFilter::new(format!("info,{}", QUIET_CRATES)))
}
