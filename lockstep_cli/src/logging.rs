//! Tracing subscriber setup: pretty or JSON lines, stderr or rolling file.

use std::ffi::OsStr;
use std::path::Path;

use lockstep_config::Logging;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Level resolution: `RUST_LOG` env var,
/// then the config's `logging.level`, then the CLI default.
pub fn init(cfg: &Logging, json: bool, default_level: &str) -> eyre::Result<()> {
    let level = cfg.level.as_deref().unwrap_or(default_level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if let Some(file) = &cfg.file {
        let path = Path::new(file);
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let name = path.file_name().unwrap_or(OsStr::new("lockstep.log"));
        let appender = match cfg.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        // Keep the worker alive for the life of the process.
        let _ = crate::cli::FILE_GUARD.set(guard);
        if json {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .with_writer(writer)
                .init();
        } else {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(writer)
                .init();
        }
    } else if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}
