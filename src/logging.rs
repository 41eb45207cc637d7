use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_error::ErrorLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::domain::PanelError;

/// Install the global subscriber.
///
/// The terminal belongs to the UI, so events go to `log_file` or nowhere.
/// `RUST_LOG` overrides the default `info` level.
pub fn init(log_file: Option<&Path>) -> Result<(), PanelError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let _ = tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .with(ErrorLayer::default())
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(io::sink))
                .with(ErrorLayer::default())
                .try_init();
        }
    }
    Ok(())
}
