//! Proxy Harvester - gather public proxy lists and keep the ones that work
//!
//! Candidates are fetched from public lists, normalized, deduplicated and
//! validated by sending a real request through each of them, with a bounded
//! number of probes in flight, until a quota of working proxies is reached.

pub mod config;
pub mod pipeline;
pub mod proxy;

pub use config::{ConfigError, PipelineConfig};
pub use pipeline::{Outcome, Pipeline, RunSummary};
pub use proxy::*;

use log::LevelFilter;

/// Application result type
pub type Result<T> = anyhow::Result<T>;

/// Map a `-v` count to a log level: 0 off, 1 error, 2 warn, 3 info,
/// 4 debug, 5 and above trace.
pub fn verbosity_level(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Off,
        1 => LevelFilter::Error,
        2 => LevelFilter::Warn,
        3 => LevelFilter::Info,
        4 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Initializes logging on stderr for this crate's modules.
///
/// At verbosity 0 no logger is installed at all, so nothing is printed,
/// errors included.
pub fn initialize_logging(verbosity: u8) -> Result<()> {
    let level = verbosity_level(verbosity);
    if level == LevelFilter::Off {
        return Ok(());
    }

    stderrlog::new()
        .module(module_path!())
        .show_module_names(verbosity >= 4)
        .verbosity(level)
        .init()?;
    Ok(())
}
