use crate::config::CheckerConfig;
use crate::probe::Probe;
use crate::result::{ProbeResult, ProbeStatus};
use futures::FutureExt;
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinError, JoinSet};
use tracing::{debug, info, warn};

/// Probes finished so far out of the total scheduled for the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
}

impl Progress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.processed as f64 / self.total as f64
        }
    }
}

pub type ProgressCallback = Arc<dyn Fn(Progress) + Send + Sync>;

/// Number of URLs kept by sampling `total` URLs at `rate`.
pub fn sample_size(total: usize, rate: f64) -> usize {
    if rate >= 1.0 {
        total
    } else {
        ((rate * total as f64).floor() as usize).max(1).min(total)
    }
}

/// Uniform sample without replacement. Rates of 1.0 and above keep everything
/// in the original order.
pub fn sample_with<R: Rng + ?Sized>(urls: Vec<String>, rate: f64, rng: &mut R) -> Vec<String> {
    if rate >= 1.0 || urls.is_empty() {
        return urls;
    }
    let amount = sample_size(urls.len(), rate);
    urls.choose_multiple(rng, amount).cloned().collect()
}

pub fn sample(urls: Vec<String>, rate: f64) -> Vec<String> {
    sample_with(urls, rate, &mut rand::thread_rng())
}

/// Contiguous chunks of `batch_size`; a single batch when there is no limit.
pub fn partition(urls: Vec<String>, batch_size: Option<usize>) -> Vec<Vec<String>> {
    match batch_size {
        Some(size) if size > 0 && urls.len() > size => {
            urls.chunks(size).map(|chunk| chunk.to_vec()).collect()
        }
        _ if urls.is_empty() => Vec::new(),
        _ => vec![urls],
    }
}

/// Samples, batches and fans probes out over a bounded worker pool.
pub struct BatchScheduler {
    config: CheckerConfig,
    progress_callback: Option<ProgressCallback>,
}

impl BatchScheduler {
    pub fn new(config: CheckerConfig) -> Self {
        Self {
            config,
            progress_callback: None,
        }
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Check every (sampled) URL. Results are in completion order within a
    /// batch; batches run one after another.
    pub async fn run<P: Probe>(&self, urls: Vec<String>, probe: Arc<P>) -> Vec<ProbeResult> {
        let sampled = sample(urls, self.config.sampling_rate());
        self.run_sampled(sampled, probe).await
    }

    /// Same as [`run`](Self::run) for a URL list that is already sampled.
    pub async fn run_sampled<P: Probe>(&self, urls: Vec<String>, probe: Arc<P>) -> Vec<ProbeResult> {
        let total = urls.len();
        let batches = partition(urls, self.config.batch_size());
        info!(
            "Checking {} URLs in {} batch(es) with {} workers",
            total,
            batches.len(),
            self.config.max_workers()
        );

        let mut results = Vec::with_capacity(total);
        let batch_count = batches.len();
        for (idx, batch) in batches.into_iter().enumerate() {
            debug!("Starting batch {}/{} ({} URLs)", idx + 1, batch_count, batch.len());
            self.run_batch(batch, probe.clone(), total, &mut results).await;
        }

        info!("Finished checking {} URLs", results.len());
        results
    }

    async fn run_batch<P: Probe>(
        &self,
        batch: Vec<String>,
        probe: Arc<P>,
        total: usize,
        results: &mut Vec<ProbeResult>,
    ) {
        // Fresh pool per batch; the permit is the worker slot
        let slots = Arc::new(Semaphore::new(self.config.max_workers()));
        let mut in_flight = JoinSet::new();
        let mut pending = HashMap::with_capacity(batch.len());

        for url in batch {
            let probe = probe.clone();
            let slots = slots.clone();
            let key = url.clone();
            let handle = in_flight.spawn(async move {
                let _permit = match slots.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return ProbeResult::with_error(
                            url,
                            ProbeStatus::Error,
                            "worker pool closed".to_string(),
                        );
                    }
                };

                let outcome = AssertUnwindSafe(probe.probe(&url)).catch_unwind().await;
                match outcome {
                    Ok(result) => result,
                    Err(_) => {
                        warn!("Probe for {} panicked", url);
                        ProbeResult::with_error(url, ProbeStatus::Error, "probe panicked".to_string())
                    }
                }
            });
            pending.insert(handle.id(), key);
        }

        while let Some(joined) = in_flight.join_next_with_id().await {
            if let Some(result) = settle(joined, &mut pending) {
                results.push(result);
                if let Some(ref callback) = self.progress_callback {
                    callback(Progress {
                        processed: results.len(),
                        total,
                    });
                }
            }
        }
    }
}

/// Turn one finished task into its result. A task that died without
/// producing one still yields an `Error` result for its URL.
fn settle(
    joined: std::result::Result<(task::Id, ProbeResult), JoinError>,
    pending: &mut HashMap<task::Id, String>,
) -> Option<ProbeResult> {
    match joined {
        Ok((id, result)) => {
            pending.remove(&id);
            Some(result)
        }
        Err(e) => {
            let url = pending.remove(&e.id())?;
            warn!("Probe task for {} failed: {}", url, e);
            Some(ProbeResult::with_error(
                url,
                ProbeStatus::Error,
                format!("probe task failed: {}", e),
            ))
        }
    }
}
