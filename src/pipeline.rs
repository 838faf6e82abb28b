//! Validation pipeline: normalize, deduplicate, probe, collect.

use crate::config::{ConfigError, PipelineConfig};
use crate::proxy::checker::{Probe, ProxyChecker};
use crate::proxy::collector::QuotaCollector;
use crate::proxy::dedup::deduplicate;
use crate::proxy::models::{Proxy, ProxyTask, ProxyType};
use crate::proxy::parser::ProxyParser;
use crate::proxy::pool::ValidatorPool;
use crate::Result;
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Exit status when at least one class found a working proxy
pub const EXIT_FOUND: u8 = 0;
/// Exit status for usage and configuration errors
pub const EXIT_USAGE: u8 = 1;
/// Exit status when every class came up empty
pub const EXIT_NOTHING_FOUND: u8 = 2;

const PROGRESS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The quota of working proxies was collected
    QuotaMet,
    /// Every candidate was tried before the quota was met
    Exhausted,
}

/// Everything a finished run knows about itself
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub kind: ProxyType,
    /// Raw lines offered to the normalizer (blank lines included)
    pub candidates: usize,
    pub malformed: usize,
    pub duplicates: usize,
    /// Unique endpoints queued for probing
    pub unique: usize,
    /// Endpoints actually probed
    pub probed: usize,
    pub quota: usize,
    /// Working endpoints in the order their probes finished
    pub working: Vec<Proxy>,
    pub outcome: Outcome,
    pub elapsed_ms: u64,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn found_any(&self) -> bool {
        !self.working.is_empty()
    }
}

/// One pipeline instance owns its configuration and probe; all per-run
/// state (collector, pool) is created inside [`Pipeline::run`].
pub struct Pipeline<P: ?Sized> {
    config: Arc<PipelineConfig>,
    probe: Arc<P>,
}

impl Pipeline<ProxyChecker> {
    /// Pipeline probing through real HTTP requests
    pub fn from_config(config: PipelineConfig) -> std::result::Result<Self, ConfigError> {
        let probe = Arc::new(ProxyChecker::with_config(config.checker.clone()));
        Self::with_probe(config, probe)
    }
}

impl<P> Pipeline<P>
where
    P: Probe + ?Sized + 'static,
{
    pub fn with_probe(
        config: PipelineConfig,
        probe: Arc<P>,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            probe,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if self.config.silent {
            return ProgressBar::hidden();
        }

        let style = ProgressStyle::with_template(PROGRESS_TEMPLATE)
            .map(|style| style.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        ProgressBar::new(len as u64).with_style(style)
    }

    /// Validate raw candidate lines as `kind` proxies until the quota is met
    /// or every candidate has been tried.
    pub async fn run<I, S>(&self, kind: ProxyType, raw: I) -> RunSummary
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let start = Instant::now();

        let mut candidates = 0;
        let normalized = ProxyParser::normalize(
            raw.into_iter().inspect(|_| candidates += 1),
            kind,
        );
        log::info!(
            "Normalized {} of {} {} candidates ({} malformed)",
            normalized.proxies.len(),
            candidates,
            kind,
            normalized.malformed
        );

        let deduplicated = deduplicate(normalized.proxies);
        let unique = deduplicated.unique.len();
        let tasks: Vec<ProxyTask> = deduplicated
            .unique
            .into_iter()
            .enumerate()
            .map(|(index, proxy)| ProxyTask::new(proxy, index + 1, unique))
            .collect();

        let progress = self.progress_bar(unique);
        let collector = Arc::new(QuotaCollector::with_progress(
            self.config.quota,
            progress.clone(),
        ));
        let pool = ValidatorPool::new(Arc::clone(&self.probe), self.config.concurrency)
            .with_progress(progress.clone());

        let report = pool.run(tasks, Arc::clone(&collector)).await;
        progress.finish_and_clear();

        let outcome = if collector.is_complete() {
            Outcome::QuotaMet
        } else {
            Outcome::Exhausted
        };
        let working = collector.snapshot();
        log::info!(
            "Finished {} run: {} working out of {} probed ({:?})",
            kind,
            working.len(),
            report.submitted,
            outcome
        );

        RunSummary {
            kind,
            candidates,
            malformed: normalized.malformed,
            duplicates: deduplicated.duplicates,
            unique,
            probed: report.submitted,
            quota: self.config.quota,
            working,
            outcome,
            elapsed_ms: start.elapsed().as_millis() as u64,
            finished_at: Utc::now(),
        }
    }
}

/// Write the working proxies of a run, replacing any existing file
pub fn persist<Q: AsRef<Path>>(summary: &RunSummary, path: Q) -> Result<()> {
    ProxyParser::save_to_file(&summary.working, path)
}

/// Persist a run's working proxies if it found any.
///
/// Returns whether `path` was written. A failed write is logged and
/// otherwise ignored; an empty run leaves any existing file untouched.
pub fn save_results<Q: AsRef<Path>>(summary: &RunSummary, path: Q) -> bool {
    if !summary.found_any() {
        return false;
    }

    match persist(summary, &path) {
        Ok(()) => true,
        Err(e) => {
            log::error!(
                "Error writing working proxies to {}: {:#}",
                path.as_ref().display(),
                e
            );
            false
        }
    }
}

/// Exit status for a finished batch of runs
pub fn exit_status(summaries: &[RunSummary]) -> u8 {
    if summaries.iter().any(RunSummary::found_any) {
        EXIT_FOUND
    } else {
        EXIT_NOTHING_FOUND
    }
}

/// Write all run summaries as a JSON array
pub fn write_report<Q: AsRef<Path>>(summaries: &[RunSummary], path: Q) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, summaries)?;
    Ok(())
}
