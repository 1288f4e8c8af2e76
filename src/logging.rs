//! `tracing` subscriber setup.
//!
//! Two layers:
//!
//! - stderr, compact, filtered by `RUST_LOG` (default `warn`, so the spinner
//!   UI on stdout stays readable);
//! - optionally the run log inside the backup directory, plain text, at the
//!   level from `[log].level`.

use std::{fs::OpenOptions, path::Path, sync::Mutex};

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, Layer, filter::LevelFilter, fmt, prelude::*};

/// Console filter used when `RUST_LOG` is unset.
const DEFAULT_CONSOLE_FILTER: &str = "warn";

/// Install the global subscriber.  Call once, before any logging.
pub fn init(run_log: Option<(&Path, &str)>) -> Result<()> {
    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_CONSOLE_FILTER))
        .context("invalid console log filter")?;
    let console = fmt::layer()
        .compact()
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .with_filter(console_filter);

    let file = match run_log {
        Some((path, level)) => {
            let level: LevelFilter = level
                .parse()
                .with_context(|| format!("invalid log level '{level}'"))?;
            let f = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(f))
                    .with_filter(level),
            )
        },
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .context("installing log subscriber")
}
