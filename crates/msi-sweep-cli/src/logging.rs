use std::env;
use std::ffi::OsString;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LEVEL: &str = "info";
const DEFAULT_LOG_FILE: &str = "./logs/msi-sweep.log";

/// Console log on stderr (stdout is reserved for reports and `--json`) and
/// a plain-text copy in `LOG_FILE_PATH`. `TRACING_LEVEL` takes an
/// `EnvFilter` directive.
///
/// The returned guard flushes the file writer when dropped.
pub fn init_logger() -> WorkerGuard {
    let filter = EnvFilter::try_from_env("TRACING_LEVEL")
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL));

    let log_path = env::var_os("LOG_FILE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));
    let (log_dir, log_name) = split_log_path(&log_path);
    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(log_dir, log_name));

    let console = fmt::layer()
        .with_writer(io::stderr)
        .pretty()
        .with_file(false)
        .with_line_number(false)
        .without_time()
        .with_ansi(io::stderr().is_terminal());
    let file = fmt::layer().with_writer(file_writer).with_ansi(false);

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .with(filter)
        .init();

    debug!("Logging to stderr and {}", log_path.display());

    guard
}

/// Directory and file name for the appender. A bare file name lands in the
/// working directory.
fn split_log_path(path: &Path) -> (PathBuf, OsString) {
    let name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("msi-sweep.log"));
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    (dir, name)
}
