//! Tracing subscriber setup shared by the binaries.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::LogConfig;
use crate::error::{OrofacialError, Result};

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
///
/// When `config.dir` is set, a daily-rotated `orofacial.log` is written there
/// too; keep the returned guard alive for the lifetime of the process so the
/// file writer flushes.
pub fn init(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
    };

    let stderr = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(filter());

    let (file, guard) = match &config.dir {
        Some(dir) => {
            crate::storage::ensure_dir(dir)?;
            let appender = tracing_appender::rolling::daily(dir, "orofacial.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr)
        .with(file)
        .try_init()
        .map_err(|e| OrofacialError::Other(format!("failed to install logger: {e}")))?;
    Ok(guard)
}
