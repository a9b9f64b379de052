use std::fs::OpenOptions;

use anyhow::{Context, Result};
use log::LevelFilter;

use crate::config::LogDestination;

/// Installs the global logger. `RUST_LOG` overrides the default `info` level.
pub fn init(destination: &LogDestination) -> Result<()> {
    let mut builder = pretty_env_logger::formatted_timed_builder();
    builder.filter_level(LevelFilter::Info);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    if let LogDestination::File(path) = destination {
        let f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open logfile {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(f)));
        builder.write_style(env_logger::WriteStyle::Never);
    }

    builder.try_init().context("logger already initialized")?;
    Ok(())
}

/// Logs `msg` and, unless the log already goes there, repeats it on stderr.
pub fn error_to_both(destination: &LogDestination, msg: &str) {
    log::error!("{}", msg);
    if !destination.is_stderr() {
        eprintln!("Error: {}", msg);
    }
}

pub fn warn_to_both(destination: &LogDestination, msg: &str) {
    log::warn!("{}", msg);
    if !destination.is_stderr() {
        eprintln!("Warning: {}", msg);
    }
}
