use crate::config::Config;
use std::path::Path;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::ChronoLocal;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn timer() -> ChronoLocal {
    ChronoLocal::new(TIMESTAMP_FORMAT.to_string())
}

/// Directory holding the log file; a bare file name lives in the working
/// directory.
fn log_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

fn file_appender(path: &Path) -> Option<RollingFileAppender> {
    let dir = log_dir(path);
    let file_name = path.file_name()?.to_str()?;
    std::fs::create_dir_all(dir).ok()?;
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
        .ok()
}

/// Installs the subscriber writing to the append-only log file. Stdout
/// belongs to the gateway protocol, so when the file cannot be opened the
/// log goes nowhere. The returned guard flushes pending lines on drop.
pub fn init(config: &Config) -> WorkerGuard {
    let mut log_fmt = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_timer(timer())
        .with_target(false);
    if let Some(ref level) = config.log_level {
        if let Ok(lv) = level.as_str().parse::<LevelFilter>() {
            log_fmt = log_fmt.with_max_level(lv);
        }
    }

    let (non_blocking, guard) = match file_appender(&config.log_path()) {
        Some(appender) => tracing_appender::non_blocking(appender),
        None => tracing_appender::non_blocking(std::io::sink()),
    };
    log_fmt.with_writer(non_blocking).try_init().ok();
    guard
}
