//! Structured logging via `tracing`.
//!
//! The terminal belongs to the UI, so events go to a log file only. When no
//! file can be opened logging stays off.

use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter from `RUST_LOG`, falling back to `level`.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the global subscriber writing to `log_file`.
/// Returns false when logging could not be set up.
pub fn init_logging(log_file: Option<&Path>, level: &str) -> bool {
    let Some(path) = log_file else {
        return false;
    };
    if let Some(dir) = path.parent() {
        if std::fs::create_dir_all(dir).is_err() {
            return false;
        }
    }
    let Ok(file) = std::fs::OpenOptions::new().create(true).append(true).open(path) else {
        return false;
    };

    let file_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false) // No ANSI color codes in file output
        .with_target(true)
        .with_thread_names(true)
        .with_timer(fmt::time::uptime());

    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(file_layer)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_parsing() {
        for filter_str in ["info", "debug,tui_globe::globe=trace", "warn"] {
            assert!(EnvFilter::try_new(filter_str).is_ok(), "{filter_str}");
        }
        let filter = EnvFilter::new("info,tui_globe=debug");
        assert!(format!("{filter}").contains("tui_globe=debug"));
    }

    #[test]
    fn test_no_file_means_no_logging() {
        assert!(!init_logging(None, "info"));
    }

    #[test]
    fn test_creates_log_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("tui-globe.log");
        // The global subscriber may already be set by another test; the file
        // is created either way.
        init_logging(Some(&path), "info");
        assert!(path.exists());
    }
}
