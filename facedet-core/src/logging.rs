use std::{fs, fs::File, path::Path, sync::Mutex};

use snafu::ResultExt;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::error::*;

/// Installs the global subscriber: console output filtered by `RUST_LOG`
/// (default `info`), mirrored without colors into `log_file` when given.
pub fn init_tracing(log_file: Option<&Path>) -> Result<(), DetectError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).context(IoWriteSnafu {
                    path: parent.display().to_string(),
                })?;
            }
            let file = File::create(path).context(IoWriteSnafu {
                path: path.display().to_string(),
            })?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(())
}
