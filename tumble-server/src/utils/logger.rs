//! Logging infrastructure
//!
//! Structured logging via `tracing`. The filter comes from
//! `RUST_LOG` when set; otherwise `info`. With a log directory,
//! output also goes to a daily-rolling file.

use tracing_subscriber::EnvFilter;

/// Initialize the logger
pub fn init_logger(log_dir: Option<&str>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    if let Some(dir) = log_dir {
        let path = std::path::Path::new(dir);
        if path.exists() {
            let file_appender = tracing_appender::rolling::daily(dir, "tumble-server");
            subscriber.with_writer(file_appender).init();
            return;
        }
    }

    subscriber.init();
}
