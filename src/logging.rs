use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing_appender::non_blocking;
use tracing_subscriber::EnvFilter;

/// Console-only logging for interactive commands.
pub fn init_console(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .compact()
        .init();
}

/// Console plus a per-session log file.
pub fn init_with_file(path: &Path, verbose: bool) -> Result<()> {
    let log_file = std::fs::File::create(path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;
    let (file_writer, guard) = non_blocking(log_file);
    // The writer stops flushing once the guard drops; logging lives for the
    // whole process, so leak it.
    std::mem::forget(guard);

    use tracing_subscriber::fmt::writer::MakeWriterExt;
    let multi_writer = std::io::stderr.and(file_writer);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(multi_writer)
        .with_ansi(true)
        .with_target(false)
        .compact()
        .init();

    tracing::info!(log_file = %path.display(), "logging initialized");
    Ok(())
}

/// Resolve the `--log-file` argument: a directory gets a generated
/// per-session file name inside it.
pub fn resolve_log_path(arg: &Path) -> PathBuf {
    if arg.is_dir() {
        arg.join(default_log_name())
    } else {
        arg.to_path_buf()
    }
}

pub fn log_session_end() {
    tracing::info!("session ended");
}

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }))
}

fn default_log_name() -> String {
    format!("teamtrade-{}.log", Utc::now().format("%Y%m%d_%H%M%S"))
}
