//! Diagnostic logging setup.
//!
//! The interactive session owns the alternate screen, so diagnostics go to a
//! file in the platform data directory instead of stderr. Logging is only
//! wired up when `RUST_LOG` is set; without it the subscriber is never
//! installed and tracing macros are no-ops.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use directories::ProjectDirs;
use tracing_subscriber::EnvFilter;

pub fn diagnostics_log_path() -> Option<PathBuf> {
    let proj_dirs = ProjectDirs::from("org", "permacommons", "ultron-console")?;
    Some(proj_dirs.data_dir().join("diagnostics.log"))
}

/// Install the tracing subscriber if `RUST_LOG` requests one.
pub fn init() {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => return,
    };

    let Some(path) = diagnostics_log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if std::fs::create_dir_all(parent).is_err() {
            return;
        }
    }

    let file = match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => file,
        Err(_) => return,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    tracing::debug!(path = %path.display(), "diagnostics logging enabled");
}
