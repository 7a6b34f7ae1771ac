use std::time::Instant;

use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;
use crate::render::ParseMode;

/// Initialize the tracing subscriber with the configured log level and
/// format.
///
/// Maps config log levels to tracing levels:
/// - "DISABLED" -> no subscriber installed
/// - "WARNING" -> WARN
/// - "CRITICAL" -> ERROR
/// - Others map directly (DEBUG, INFO, ERROR)
///
/// Output goes to stderr so stdout stays free for rendered JSON.
pub fn init_tracing(log_level: &str, log_format: LogFormat) {
    let level = log_level.to_uppercase();

    if level == "DISABLED" {
        return;
    }

    let tracing_level = match level.as_str() {
        "WARNING" => "WARN",
        "CRITICAL" => "ERROR",
        other => other,
    };

    let filter = EnvFilter::try_new(tracing_level).unwrap_or_else(|_| EnvFilter::new("INFO"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);
    let _ = match log_format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

/// Record one finished parse.
pub fn log_parse_complete(mode: ParseMode, element_count: usize, started: Instant) {
    let elapsed = started.elapsed();
    debug!(
        mode = mode.as_str(),
        elements = element_count,
        duration_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
        "parse complete"
    );
}
