use std::env;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub fn get_log_dir() -> PathBuf {
    let mut log_dir = env::temp_dir();
    log_dir.push("codequest/logs");
    log_dir
}

/// Initializes the global tracing subscriber.
///
/// With `to_file`, JSON logs go to a daily file under [`get_log_dir`] and the returned guard must
/// be kept alive until the process exits. Otherwise logs go to stderr, filtered by `RUST_LOG`
/// unless `use_debug` is set.
pub fn init_tracing(to_file: bool, use_debug: bool) -> Option<WorkerGuard> {
    if to_file {
        let pid = std::process::id();
        let file_appender =
            tracing_appender::rolling::daily(get_log_dir(), format!("codequest.{pid}.log"));
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .json()
            .with_writer(non_blocking)
            .init();
        Some(guard)
    } else {
        let filter = if use_debug {
            EnvFilter::new("debug")
        } else {
            EnvFilter::from_default_env()
        };
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        None
    }
}
