use std::fs::{self, File};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{AppError, Result};

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "PB_LOG";

/// Build the filter: `$PB_LOG` when set and valid, else `default`.
pub fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default))
}

/// Route `tracing` output to `path`. The terminal belongs to the UI, so logs
/// never go to stdout or stderr.
pub fn init_tracing(path: &Path, default_filter: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::options().create(true).append(true).open(path)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .with(env_filter(default_filter))
        .try_init()
        .map_err(|error| AppError::Logging(error.to_string()))?;

    tracing::info!(log = %path.display(), "logging initialized");
    Ok(())
}
