use chrono::Local;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Used when RUST_LOG is unset
const DEFAULT_FILTER: &str = "granola_client=info,granola_docs=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize tracing to stderr, leaving stdout for command output.
/// Calling it again after a subscriber is installed is a no-op.
pub fn init_tracing() {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(stderr_layer)
        .try_init();
}

/// Like `init_tracing`, but also writes every event to a timestamped file
/// in `log_dir`. Returns the path of the new log file.
pub fn init_file_tracing(log_dir: &Path) -> std::io::Result<PathBuf> {
    let log_path = create_log_file_path(log_dir)?;
    let file = File::create(&log_path)?;

    #[cfg(unix)]
    {
        let latest_path = log_dir.join("latest.log");
        let _ = fs::remove_file(&latest_path);
        let _ = std::os::unix::fs::symlink(&log_path, &latest_path);
    }

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(false)
        .compact();
    let file_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_target(true)
        .with_ansi(false);

    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    Ok(log_path)
}

fn create_log_file_path(log_dir: &Path) -> std::io::Result<PathBuf> {
    fs::create_dir_all(log_dir)?;
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    Ok(log_dir.join(format!("granola-client_{}.log", timestamp)))
}
