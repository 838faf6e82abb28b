//! Bounded pool running one probe per task

use crate::proxy::checker::Probe;
use crate::proxy::collector::{AddOutcome, QuotaCollector};
use crate::proxy::models::ProxyTask;
use indicatif::ProgressBar;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

/// Default number of concurrent checks
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Counters describing one pool run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolReport {
    /// Tasks handed to a worker
    pub submitted: usize,
    /// Probes that ran to completion, pass or fail
    pub completed: usize,
    /// Probes that proved their endpoint, accepted by the collector or not
    pub passed: usize,
    /// Probes that panicked
    pub panicked: usize,
    /// Submission stopped because the quota was met
    pub stopped_early: bool,
}

impl PoolReport {
    fn absorb(&mut self, joined: Result<bool, JoinError>) {
        match joined {
            Ok(passed) => {
                self.completed += 1;
                if passed {
                    self.passed += 1;
                }
            }
            Err(e) if e.is_panic() => {
                log::error!("Probe task panicked: {}", e);
                self.panicked += 1;
            }
            Err(e) => log::warn!("Probe task did not finish: {}", e),
        }
    }
}

/// Runs probes with at most `concurrency` in flight.
///
/// The submission loop waits for a free slot before spawning, so no more
/// than `concurrency` probes (and outbound connections) exist at once. Each
/// slot is an owned permit moved into its worker and released when the
/// worker ends, whether it returns or panics.
pub struct ValidatorPool<P: ?Sized> {
    probe: Arc<P>,
    concurrency: usize,
    progress: ProgressBar,
}

impl<P> ValidatorPool<P>
where
    P: Probe + ?Sized + 'static,
{
    pub fn new(probe: Arc<P>, concurrency: usize) -> Self {
        Self {
            probe,
            concurrency: concurrency.max(1),
            progress: ProgressBar::hidden(),
        }
    }

    /// Tick `progress` once per completed probe
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Probe every task, feeding working endpoints to `collector`.
    ///
    /// Stops submitting once the collector's quota is met; probes already in
    /// flight are allowed to finish (each is bounded by its own timeout).
    pub async fn run(&self, tasks: Vec<ProxyTask>, collector: Arc<QuotaCollector>) -> PoolReport {
        let total = tasks.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let stop = collector.token();
        let mut workers = JoinSet::new();
        let mut report = PoolReport::default();

        self.progress.set_length(total as u64);
        log::info!(
            "Validating {} proxies with {} workers",
            total,
            self.concurrency
        );

        for task in tasks {
            let permit = tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            // A worker may have met the quota while we waited for the slot.
            if stop.is_cancelled() {
                break;
            }

            report.submitted += 1;
            let probe = Arc::clone(&self.probe);
            let collector = Arc::clone(&collector);
            let progress = self.progress.clone();

            workers.spawn(async move {
                let _permit = permit;
                let label = task.label();
                let result = probe.probe(&task.proxy).await;
                progress.inc(1);

                match result.error() {
                    None => {
                        match collector.try_add(result.proxy.clone()) {
                            AddOutcome::Rejected => log::debug!(
                                "{} Proxy {} is working but the quota is already met",
                                label,
                                task.proxy
                            ),
                            _ => log::info!(
                                "{} Proxy {} is working! ({}ms)",
                                label,
                                task.proxy,
                                result.response_time_ms.unwrap_or_default()
                            ),
                        }
                        true
                    }
                    Some(e) => {
                        log::debug!("{} Proxy {} is not working: {}", label, task.proxy, e);
                        false
                    }
                }
            });

            while let Some(joined) = workers.try_join_next() {
                report.absorb(joined);
            }
        }

        if stop.is_cancelled() {
            report.stopped_early = report.submitted < total;
            log::info!(
                "Stopped submitting after {} of {} proxies, waiting for {} in flight",
                report.submitted,
                total,
                workers.len()
            );
        }

        while let Some(joined) = workers.join_next().await {
            report.absorb(joined);
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::checker::ProbeError;
    use crate::proxy::models::{Proxy, ProxyCheckResult, ProxyType};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Records how many probes run at once; endpoints on even ports pass.
    #[derive(Default)]
    struct GaugeProbe {
        current: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Probe for GaugeProbe {
        async fn probe(&self, proxy: &Proxy) -> ProxyCheckResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);

            if proxy.port % 2 == 0 {
                ProxyCheckResult::working(proxy.clone(), 10)
            } else {
                ProxyCheckResult::failed(proxy.clone(), ProbeError::Status(503))
            }
        }
    }

    struct PanickyProbe;

    #[async_trait]
    impl Probe for PanickyProbe {
        async fn probe(&self, proxy: &Proxy) -> ProxyCheckResult {
            if proxy.port % 3 == 0 {
                panic!("probe blew up on {}", proxy);
            }
            ProxyCheckResult::failed(proxy.clone(), ProbeError::Timeout(1))
        }
    }

    fn tasks(ports: impl IntoIterator<Item = u16>) -> Vec<ProxyTask> {
        let proxies: Vec<Proxy> = ports
            .into_iter()
            .map(|port| Proxy::new("127.0.0.1".to_string(), port, ProxyType::Http))
            .collect();
        let total = proxies.len();
        proxies
            .into_iter()
            .enumerate()
            .map(|(i, p)| ProxyTask::new(p, i, total))
            .collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_peak_concurrency_bounded() {
        for concurrency in [1, 2, 3, 8] {
            let probe = Arc::new(GaugeProbe::default());
            let pool = ValidatorPool::new(Arc::clone(&probe), concurrency);
            let collector = Arc::new(QuotaCollector::new(usize::MAX));

            let report = pool.run(tasks((1..=40).map(|i| i * 2 + 1)), collector).await;

            assert_eq!(report.completed, 40);
            assert_eq!(report.passed, 0);
            let peak = probe.peak.load(Ordering::SeqCst);
            assert!(peak >= 1 && peak <= concurrency, "peak {} > {}", peak, concurrency);
        }
    }

    #[tokio::test]
    async fn test_stops_submitting_when_quota_met() {
        let probe = Arc::new(GaugeProbe::default());
        let pool = ValidatorPool::new(Arc::clone(&probe), 2);
        let collector = Arc::new(QuotaCollector::new(3));

        let report = pool
            .run(tasks(100..200), Arc::clone(&collector))
            .await;

        assert_eq!(collector.len(), 3);
        assert!(collector.is_complete());
        assert!(report.stopped_early);
        assert!(report.submitted < 100);
        assert_eq!(probe.calls.load(Ordering::SeqCst), report.submitted);
        assert_eq!(report.completed, report.submitted);
    }

    #[tokio::test]
    async fn test_panics_release_slots() {
        let pool = ValidatorPool::new(Arc::new(PanickyProbe), 1);
        let collector = Arc::new(QuotaCollector::new(5));

        let report = pool.run(tasks(1..=30), Arc::clone(&collector)).await;

        assert_eq!(report.submitted, 30);
        assert_eq!(report.panicked, 10);
        assert_eq!(report.completed, 20);
        assert!(collector.is_empty());
    }

    #[tokio::test]
    async fn test_empty_task_list() {
        let pool = ValidatorPool::new(Arc::new(GaugeProbe::default()), 4);
        let collector = Arc::new(QuotaCollector::new(2));

        let report = pool.run(Vec::new(), Arc::clone(&collector)).await;

        assert_eq!(report, PoolReport::default());
        assert!(!collector.is_complete());
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        let pool = ValidatorPool::new(Arc::new(GaugeProbe::default()), 0);
        assert_eq!(pool.concurrency(), 1);
    }
}
