//! Tracing setup.
//!
//! Stdout belongs to the interactive menu, so logs go to the systemd journal
//! on Linux and to a daily rolling file otherwise.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the filter directives.
pub const LOG_ENV: &str = "CALIBROLINO_LOG";

const DEFAULT_DIRECTIVES: &str = "calibrolino=info,warn";

/// Where log records end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Journald,
    File(PathBuf),
}

/// Install the global subscriber. Files go under `log_dir` when the journal
/// is unavailable.
pub fn init(log_dir: &Path) -> Result<Backend> {
    let filter = filter_from(std::env::var(LOG_ENV).ok().as_deref());

    #[cfg(target_os = "linux")]
    {
        if let Ok(journald) = tracing_journald::layer() {
            tracing_subscriber::registry()
                .with(filter)
                .with(journald.with_syslog_identifier("calibrolino".to_string()))
                .try_init()?;
            tracing::info!("Logging to journald");
            return Ok(Backend::Journald);
        }
    }

    std::fs::create_dir_all(log_dir)?;
    let appender = tracing_appender::rolling::daily(log_dir, "calibrolino.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    // Dropping the guard stops the writer thread.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()?;

    tracing::info!(dir = %log_dir.display(), "Logging to file");
    Ok(Backend::File(log_dir.to_path_buf()))
}

/// Filter from `directives`, or the default when absent or unparsable.
pub fn filter_from(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}
