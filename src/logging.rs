use std::fs;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing stack: human-readable console output plus a
/// daily-rolling JSON log file under `logs/`. RUST_LOG overrides the
/// default filter.
pub fn init_logging() {
    let _ = fs::create_dir_all("logs");

    let file_appender = tracing_appender::rolling::daily("logs", "housing_signals.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("housing_signals=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().with_writer(file_writer))
        .with(fmt::layer().with_writer(std::io::stdout))
        .init();

    // The appender flushes on drop; leak the guard so logs survive until
    // process exit.
    std::mem::forget(guard);
}
