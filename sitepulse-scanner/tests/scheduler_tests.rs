// Tests for the bounded worker pool, using in-process probes

use sitepulse_scanner::{
    BatchScheduler, CheckerConfig, Probe, ProbeResult, ProbeStatus, Progress, ProgressCallback,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records how many probes run at once and the order they start in.
#[derive(Default)]
struct CountingProbe {
    active: AtomicUsize,
    peak: AtomicUsize,
    started: Mutex<Vec<String>>,
}

impl Probe for CountingProbe {
    async fn probe(&self, url: &str) -> ProbeResult {
        self.started.lock().unwrap().push(url.to_string());
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(20)).await;

        self.active.fetch_sub(1, Ordering::SeqCst);
        let mut result = ProbeResult::new(url.to_string());
        result.status = ProbeStatus::Healthy;
        result.http_code = Some(200);
        result
    }
}

/// Panics on any URL containing "boom".
struct FlakyProbe;

impl Probe for FlakyProbe {
    async fn probe(&self, url: &str) -> ProbeResult {
        if url.contains("boom") {
            panic!("probe blew up on {url}");
        }
        let mut result = ProbeResult::new(url.to_string());
        result.status = ProbeStatus::Unhealthy;
        result.http_code = Some(500);
        result
    }
}

fn urls(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("https://example.com/page/{i}")).collect()
}

fn config(workers: usize, batch: usize) -> CheckerConfig {
    CheckerConfig::builder()
        .max_workers(workers)
        .batch_size(batch)
        .build()
        .unwrap()
}

// ============================================================================
// Concurrency bound
// ============================================================================

#[tokio::test]
async fn test_never_exceeds_max_workers() {
    let probe = Arc::new(CountingProbe::default());
    let scheduler = BatchScheduler::new(config(3, 0));

    let results = scheduler.run(urls(20), probe.clone()).await;

    assert_eq!(results.len(), 20);
    let peak = probe.peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak concurrency was {peak}");
    assert!(peak >= 2, "workers never overlapped");
}

#[tokio::test]
async fn test_single_worker_is_sequential() {
    let probe = Arc::new(CountingProbe::default());
    let scheduler = BatchScheduler::new(config(1, 0));

    scheduler.run(urls(5), probe.clone()).await;
    assert_eq!(probe.peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_every_url_gets_exactly_one_result() {
    let probe = Arc::new(CountingProbe::default());
    let scheduler = BatchScheduler::new(config(4, 0));
    let input = urls(17);

    let results = scheduler.run(input.clone(), probe).await;

    let got: HashSet<_> = results.iter().map(|r| r.url.clone()).collect();
    let want: HashSet<_> = input.into_iter().collect();
    assert_eq!(results.len(), 17);
    assert_eq!(got, want);
    assert!(results.iter().all(|r| r.status != ProbeStatus::Unchecked));
}

#[tokio::test]
async fn test_empty_input_returns_nothing() {
    let probe = Arc::new(CountingProbe::default());
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let scheduler = BatchScheduler::new(config(4, 0)).with_progress_callback(Arc::new(
        move |_: Progress| {
            counter.fetch_add(1, Ordering::SeqCst);
        },
    ));

    let results = scheduler.run(Vec::new(), probe.clone()).await;

    assert!(results.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(probe.started.lock().unwrap().is_empty());
}

// ============================================================================
// Batching
// ============================================================================

#[tokio::test]
async fn test_batches_run_one_after_another() {
    let probe = Arc::new(CountingProbe::default());
    let scheduler = BatchScheduler::new(config(10, 4));
    let input = urls(10);

    let results = scheduler.run(input.clone(), probe.clone()).await;
    assert_eq!(results.len(), 10);

    // A batch never starts before the previous one has fully finished, so the
    // start order groups URLs by batch.
    let started = probe.started.lock().unwrap().clone();
    for (idx, chunk) in input.chunks(4).enumerate() {
        let offset = idx * 4;
        let window: HashSet<_> = started[offset..offset + chunk.len()].iter().collect();
        let expected: HashSet<_> = chunk.iter().collect();
        assert_eq!(window, expected, "batch {idx} interleaved with another");
    }
    assert!(probe.peak.load(Ordering::SeqCst) <= 4);
}

// ============================================================================
// Sampling
// ============================================================================

#[tokio::test]
async fn test_sampling_rate_reduces_checked_urls() {
    let probe = Arc::new(CountingProbe::default());
    let config = CheckerConfig::builder()
        .max_workers(5)
        .sampling_rate(0.5)
        .build()
        .unwrap();
    let input = urls(10);

    let results = BatchScheduler::new(config).run(input.clone(), probe).await;

    assert_eq!(results.len(), 5);
    let unique: HashSet<_> = results.iter().map(|r| &r.url).collect();
    assert_eq!(unique.len(), 5);
    assert!(results.iter().all(|r| input.contains(&r.url)));
}

// ============================================================================
// Progress and fault isolation
// ============================================================================

#[tokio::test]
async fn test_progress_is_monotonic_and_completes() {
    let probe = Arc::new(CountingProbe::default());
    let seen: Arc<Mutex<Vec<Progress>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let callback: ProgressCallback = Arc::new(move |p: Progress| sink.lock().unwrap().push(p));

    let scheduler = BatchScheduler::new(config(3, 4)).with_progress_callback(callback);
    scheduler.run(urls(9), probe).await;

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 9);
    assert!(seen.windows(2).all(|w| w[0].processed < w[1].processed));
    assert!(seen.iter().all(|p| p.total == 9));
    assert_eq!(seen.last().unwrap().fraction(), 1.0);
}

#[tokio::test]
async fn test_panicking_probe_becomes_error_result() {
    let scheduler = BatchScheduler::new(config(2, 0));
    let input = vec![
        "https://example.com/ok".to_string(),
        "https://example.com/boom".to_string(),
        "https://example.com/fine".to_string(),
    ];

    let results = scheduler.run(input, Arc::new(FlakyProbe)).await;

    assert_eq!(results.len(), 3);
    let failed = results
        .iter()
        .find(|r| r.url.ends_with("/boom"))
        .expect("panicked URL still reported");
    assert_eq!(failed.status, ProbeStatus::Error);
    assert!(failed.error.is_some());
    assert_eq!(
        results
            .iter()
            .filter(|r| r.status == ProbeStatus::Unhealthy)
            .count(),
        2
    );
}
