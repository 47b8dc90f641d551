use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

const DEFAULT_LOG_FILE: &str = "shelterfeed.log";

/// Normalise a configured level name into a filter directive.
pub fn level_directive(default_level: &str) -> &'static str {
    match default_level.trim().to_lowercase().as_str() {
        "error" => "error",
        "warn" | "warning" => "warn",
        "debug" => "debug",
        "trace" => "trace",
        _ => "info",
    }
}

/// Initialize tracing for the application.
///
/// Events go to stderr so operator prompts on stdout stay readable. When
/// `log_file` is given, the same events are also appended to that file through
/// a non-blocking writer; the returned guard must be held until exit so the
/// writer can flush. `RUST_LOG` takes precedence over `default_level`.
pub fn init(default_level: &str, log_file: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(default_level)));
    let console = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .map(Path::new)
                .unwrap_or_else(|| Path::new(DEFAULT_LOG_FILE));
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
            let file = fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer);

            // try_init so tests and repeated calls never panic
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(file)
                .try_init();
            Some(guard)
        }
        None => {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .try_init();
            None
        }
    }
}
