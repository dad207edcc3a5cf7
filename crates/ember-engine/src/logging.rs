use std::fs::OpenOptions;
use std::io::{self, BufWriter};
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging for an embedding host.
///
/// Console output always; pass a log file path to also append there through
/// a non-blocking writer. Returns a guard that must be kept alive for the
/// duration of the program when file logging is enabled.
pub fn init_logging(log_file: Option<&Path>) -> io::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let (non_blocking_file, guard) = tracing_appender::non_blocking(BufWriter::new(file));

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(io::stdout).with_ansi(true))
                .with(
                    fmt::layer()
                        .with_writer(non_blocking_file)
                        .with_ansi(false)
                        .with_target(true),
                )
                .init();

            tracing::info!("Logging to file: {}", path.display());
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(env_filter).init();
            Ok(None)
        }
    }
}
