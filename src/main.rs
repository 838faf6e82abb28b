use clap::Parser;
use colored::Colorize;
use proxy_harvester::pipeline::{exit_status, save_results, write_report, EXIT_USAGE};
use proxy_harvester::{
    initialize_logging, CrawlerConfig, Outcome, Pipeline, PipelineConfig, ProxyClass,
    ProxyCrawler, ProxyType, Result, RunSummary, SuccessCriterion,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

/// Gather public proxy lists and keep the proxies that actually work
#[derive(Parser)]
#[command(name = "proxy-harvester", version)]
#[command(about = "Gather public proxy lists and keep the proxies that actually work")]
struct Cli {
    /// Use SOCKS5 proxy type
    #[arg(long = "s5")]
    socks5: bool,

    /// Use SOCKS4 proxy type
    #[arg(long = "s4")]
    socks4: bool,

    /// Use HTTP/S proxy type
    #[arg(long = "hs")]
    http: bool,

    /// Number of probes running at once
    #[arg(short = 'c', long, default_value_t = proxy_harvester::pool::DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Number of working proxies to collect per type
    #[arg(short = 'n', long = "count", default_value_t = proxy_harvester::config::DEFAULT_QUOTA)]
    quota: usize,

    /// Request timeout in seconds for each probe
    #[arg(long = "timeout", visible_alias = "to", default_value_t = proxy_harvester::checker::DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Verbosity level: 0 off, 1 error, 2 warn, 3 info, 4 debug, 5 trace
    #[arg(short, long, default_value_t = 0)]
    verbosity: u8,

    /// Hide the progress bar and the final summary
    #[arg(short, long)]
    silent: bool,

    /// Output file (only with a single proxy type; defaults to <type>.txt)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// URL requested through every candidate
    #[arg(long, default_value = proxy_harvester::checker::DEFAULT_TEST_URL)]
    target: String,

    /// Accept any 200 response instead of requiring the target to echo the proxy address
    #[arg(long)]
    status_only: bool,

    /// Read candidates from this file instead of the public lists
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// File with additional source URLs (one URL per line)
    #[arg(long)]
    sources_file: Option<PathBuf>,

    /// Timeout in seconds for downloading each source list
    #[arg(long, default_value_t = proxy_harvester::crawler::DEFAULT_TIMEOUT_SECS)]
    fetch_timeout: u64,

    /// Write a JSON report of every run to this file
    #[arg(long)]
    report: Option<PathBuf>,
}

impl Cli {
    fn selected_types(&self) -> Vec<ProxyType> {
        [
            (self.socks5, ProxyType::Socks5),
            (self.socks4, ProxyType::Socks4),
            (self.http, ProxyType::Http),
        ]
        .into_iter()
        .filter_map(|(selected, kind)| selected.then_some(kind))
        .collect()
    }

    fn pipeline_config(&self) -> PipelineConfig {
        let criterion = if self.status_only {
            SuccessCriterion::Status
        } else {
            SuccessCriterion::EchoHost
        };

        PipelineConfig::new()
            .with_concurrency(self.concurrency)
            .with_quota(self.quota)
            .with_silent(self.silent)
            .with_timeout(Duration::from_secs(self.timeout))
            .with_test_url(self.target.clone())
            .with_criterion(criterion)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = initialize_logging(cli.verbosity) {
        eprintln!("Error: could not initialize logging: {}", e);
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_USAGE)
        }
    }
}

fn usage_error(message: &str) -> ExitCode {
    log::error!("{}", message);
    eprintln!("Error: {}", message);
    ExitCode::from(EXIT_USAGE)
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let types = cli.selected_types();
    if types.is_empty() {
        return Ok(usage_error(
            "Please select at least one of the flags --s5, --s4, or --hs.",
        ));
    }
    if cli.output.is_some() && types.len() > 1 {
        return Ok(usage_error(
            "--output can only be used with a single proxy type.",
        ));
    }

    let pipeline = match Pipeline::from_config(cli.pipeline_config()) {
        Ok(pipeline) => pipeline,
        Err(e) => return Ok(usage_error(&e.to_string())),
    };

    let extra_sources = match &cli.sources_file {
        Some(path) => ProxyCrawler::read_list_file(path)?,
        None => Vec::new(),
    };
    let crawler = ProxyCrawler::with_config(
        CrawlerConfig::new().with_timeout(Duration::from_secs(cli.fetch_timeout)),
    )?;

    let mut summaries = Vec::new();
    for kind in types {
        let class = ProxyClass::defaults(kind).with_extra_sources(extra_sources.iter().cloned());

        let raw = match &cli.input {
            Some(path) => {
                log::info!("Reading {} candidates from {}", class.kind, path.display());
                ProxyCrawler::read_list_file(path)?
            }
            None => crawler.collect(&class).await,
        };

        let summary = pipeline.run(class.kind, raw).await;

        let output = cli
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(class.output_file()));
        let written = save_results(&summary, &output);

        if !cli.silent {
            print_summary(&summary, written.then_some(output.as_path()));
        }
        summaries.push(summary);
    }

    if let Some(report) = &cli.report {
        if let Err(e) = write_report(&summaries, report) {
            log::error!("Error writing report {}: {:#}", report.display(), e);
        }
    }

    Ok(ExitCode::from(exit_status(&summaries)))
}

fn print_summary(summary: &RunSummary, written: Option<&Path>) {
    let found = format!("{}/{}", summary.working.len(), summary.quota);
    let headline = match summary.outcome {
        Outcome::QuotaMet => format!("{} {} {} working", "✓".green().bold(), summary.kind, found),
        Outcome::Exhausted if summary.found_any() => {
            format!("{} {} {} working", "!".yellow().bold(), summary.kind, found)
        }
        Outcome::Exhausted => format!("{} {} no working proxies", "✗".red().bold(), summary.kind),
    };
    println!("{}", headline);
    println!(
        "  {} candidates, {} malformed, {} duplicates, {} probed in {:.1}s",
        summary.candidates,
        summary.malformed,
        summary.duplicates,
        summary.probed,
        summary.elapsed_ms as f64 / 1000.0
    );
    if let Some(path) = written {
        println!("  saved to {}", path.display().to_string().cyan());
    }
}
