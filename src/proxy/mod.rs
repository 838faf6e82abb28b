//! Proxy module for gathering and validating proxies
//!
//! This module provides functionality for:
//! - Fetching candidate lists from public sources
//! - Normalizing and deduplicating candidates
//! - Probing candidates with a bounded number in flight
//! - Collecting working proxies up to a quota

pub mod checker;
pub mod collector;
pub mod crawler;
pub mod dedup;
pub mod models;
pub mod parser;
pub mod pool;

pub use checker::{CheckerConfig, Probe, ProbeError, ProxyChecker, SuccessCriterion};
pub use collector::{AddOutcome, QuotaCollector};
pub use crawler::{CrawlerConfig, ProxyClass, ProxyCrawler};
pub use dedup::{deduplicate, Deduplicated};
pub use models::{Proxy, ProxyCheckResult, ProxyCheckStatus, ProxyTask, ProxyType};
pub use parser::{Normalized, ProxyParser};
pub use pool::{PoolReport, ValidatorPool};
