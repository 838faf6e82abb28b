//! Quota-aware collection of working proxies

use crate::proxy::models::Proxy;
use indicatif::ProgressBar;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

/// What happened to an endpoint offered to the collector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Appended; quota not yet met
    Accepted,
    /// Appended and this append met the quota
    QuotaReached,
    /// Quota was already met, nothing appended
    Rejected,
}

/// Single arbiter of "are we done yet".
///
/// The size check and the append happen under one lock, so the result set
/// never grows past the quota and exactly one caller observes
/// [`AddOutcome::QuotaReached`]. Meeting the quota cancels [`Self::token`].
pub struct QuotaCollector {
    quota: usize,
    found: Mutex<Vec<Proxy>>,
    done: CancellationToken,
    progress: ProgressBar,
}

impl QuotaCollector {
    pub fn new(quota: usize) -> Self {
        Self::with_progress(quota, ProgressBar::hidden())
    }

    /// Collector that reports `found/quota` on the given progress bar
    pub fn with_progress(quota: usize, progress: ProgressBar) -> Self {
        let done = CancellationToken::new();
        if quota == 0 {
            done.cancel();
        }
        progress.set_message(format!("0/{} working", quota));

        Self {
            quota,
            found: Mutex::new(Vec::new()),
            done,
            progress,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Proxy>> {
        self.found.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn try_add(&self, proxy: Proxy) -> AddOutcome {
        let mut found = self.lock();
        if found.len() >= self.quota {
            return AddOutcome::Rejected;
        }

        found.push(proxy);
        self.progress
            .set_message(format!("{}/{} working", found.len(), self.quota));

        if found.len() == self.quota {
            log::info!("Quota of {} working proxies reached", self.quota);
            self.done.cancel();
            AddOutcome::QuotaReached
        } else {
            AddOutcome::Accepted
        }
    }

    pub fn quota(&self) -> usize {
        self.quota
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_complete(&self) -> bool {
        self.done.is_cancelled()
    }

    /// Cancelled once the quota is met; the pool stops submitting on it
    pub fn token(&self) -> CancellationToken {
        self.done.clone()
    }

    /// Copy of the endpoints collected so far, in arrival order
    pub fn snapshot(&self) -> Vec<Proxy> {
        self.lock().clone()
    }

    pub fn into_results(self) -> Vec<Proxy> {
        self.found.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::models::ProxyType;
    use std::sync::Arc;

    fn proxy(i: u16) -> Proxy {
        Proxy::new("10.0.0.1".to_string(), 1000 + i, ProxyType::Socks5)
    }

    #[test]
    fn test_fills_up_to_quota_then_rejects() {
        let collector = QuotaCollector::new(2);
        assert_eq!(collector.try_add(proxy(1)), AddOutcome::Accepted);
        assert!(!collector.is_complete());
        assert_eq!(collector.try_add(proxy(2)), AddOutcome::QuotaReached);
        assert!(collector.is_complete());
        assert_eq!(collector.try_add(proxy(3)), AddOutcome::Rejected);
        assert_eq!(collector.snapshot(), vec![proxy(1), proxy(2)]);
    }

    #[test]
    fn test_huge_quota_allocates_lazily() {
        let collector = QuotaCollector::new(usize::MAX);
        assert_eq!(collector.try_add(proxy(1)), AddOutcome::Accepted);
        assert_eq!(collector.len(), 1);
        assert!(!collector.is_complete());
    }

    #[test]
    fn test_zero_quota_is_complete_immediately() {
        let collector = QuotaCollector::new(0);
        assert!(collector.is_complete());
        assert_eq!(collector.try_add(proxy(1)), AddOutcome::Rejected);
        assert!(collector.is_empty());
    }

    #[test]
    fn test_token_cancelled_on_quota() {
        let collector = QuotaCollector::new(1);
        let token = collector.token();
        assert!(!token.is_cancelled());
        collector.try_add(proxy(1));
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_concurrent_adds_never_exceed_quota() {
        let collector = Arc::new(QuotaCollector::new(7));
        let handles: Vec<_> = (0..16)
            .map(|t| {
                let collector = Arc::clone(&collector);
                std::thread::spawn(move || {
                    (0..50)
                        .map(|i| collector.try_add(proxy(t * 50 + i)))
                        .filter(|o| *o == AddOutcome::QuotaReached)
                        .count()
                })
            })
            .collect();

        let completions: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(completions, 1);
        assert_eq!(collector.len(), 7);
    }

    #[test]
    fn test_frozen_after_quota() {
        let collector = QuotaCollector::new(3);
        for i in 0..3 {
            collector.try_add(proxy(i));
        }
        let frozen = collector.snapshot();
        for i in 3..10 {
            assert_eq!(collector.try_add(proxy(i)), AddOutcome::Rejected);
        }
        assert_eq!(collector.into_results(), frozen);
    }
}
