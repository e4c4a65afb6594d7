//! Worker pool that tests many proxies concurrently

use crate::proxy::error::PoolError;
use crate::proxy::models::{ProbeResult, ProxyAddress};
use crate::proxy::probe::{HttpProbe, Probe, DEFAULT_TIMEOUT_SECS};
use log::{debug, error, info};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

/// Default number of concurrent workers
pub const DEFAULT_WORKERS: usize = 10;

/// Configuration for the proxy pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of concurrent workers, fixed for one run
    pub workers: NonZeroUsize,
    /// Timeout for each probe
    pub timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: NonZeroUsize::new(DEFAULT_WORKERS).unwrap_or(NonZeroUsize::MIN),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workers(mut self, workers: NonZeroUsize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Fixed-size pool of workers, each running one probe at a time
pub struct ProxyPool<P = HttpProbe> {
    probe: Arc<P>,
    config: PoolConfig,
}

impl ProxyPool<HttpProbe> {
    /// Create a pool backed by the default HTTP probe
    pub fn new(config: PoolConfig) -> Self {
        Self::with_probe(HttpProbe::new(), config)
    }
}

impl<P: Probe + 'static> ProxyPool<P> {
    pub fn with_probe(probe: P, config: PoolConfig) -> Self {
        Self {
            probe: Arc::new(probe),
            config,
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Probe every address exactly once and return all results.
    ///
    /// Results arrive in completion order, not input order. Proxy failures
    /// are data on the results; an `Err` means the pool itself broke.
    pub async fn test_all(&self, proxies: Vec<ProxyAddress>) -> Result<Vec<ProbeResult>, PoolError> {
        let total = proxies.len();
        if total == 0 {
            debug!("No proxies to test, skipping worker startup");
            return Ok(Vec::new());
        }

        let worker_count = self.config.workers.get().min(total);
        info!(
            "Testing {} proxies with {} workers (timeout {:?})",
            total, worker_count, self.config.timeout
        );
        let started = Instant::now();

        // Both queues hold the whole batch, so sends never wait.
        let (work_tx, work_rx) = mpsc::channel::<ProxyAddress>(total);
        let work_rx = Arc::new(Mutex::new(work_rx));
        let (result_tx, mut result_rx) = mpsc::channel::<ProbeResult>(total);

        let mut workers = JoinSet::new();
        for id in 0..worker_count {
            let jobs = Arc::clone(&work_rx);
            let results = result_tx.clone();
            let probe = Arc::clone(&self.probe);
            let timeout = self.config.timeout;

            workers.spawn(async move {
                let mut handled = 0usize;
                loop {
                    let next = jobs.lock().await.recv().await;
                    let Some(address) = next else { break };

                    let result = probe.probe(&address, timeout).await;
                    handled += 1;
                    if results.send(result).await.is_err() {
                        break;
                    }
                }
                debug!("Worker {} done after {} proxies", id, handled);
            });
        }
        drop(work_rx);

        // A send only fails once every worker is gone; the supervisor reports why.
        for address in proxies {
            if work_tx.send(address).await.is_err() {
                break;
            }
        }
        drop(work_tx);

        let supervisor = tokio::spawn(async move {
            let mut failures = Vec::new();
            while let Some(joined) = workers.join_next().await {
                if let Err(e) = joined {
                    error!("Worker task failed: {}", e);
                    failures.push(e);
                }
            }
            drop(result_tx);
            failures
        });

        let mut collected = Vec::with_capacity(total);
        while let Some(result) = result_rx.recv().await {
            collected.push(result);
        }

        let mut failures = supervisor.await.map_err(PoolError::Supervisor)?;
        if !failures.is_empty() {
            let count = failures.len();
            return Err(PoolError::WorkerFailed {
                count,
                first: failures.swap_remove(0),
            });
        }
        debug_assert_eq!(collected.len(), total);

        info!(
            "Tested {} proxies in {:.2}s, {} working",
            total,
            started.elapsed().as_secs_f64(),
            collected.iter().filter(|r| r.is_working()).count()
        );
        Ok(collected)
    }
}
