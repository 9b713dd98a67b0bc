use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use sitepulse_scanner::{
    BatchScheduler, CheckerConfig, HealthProbe, Probe, ProbeResult, Progress, ProgressCallback,
    Resolution, ResolverConfig, SitemapFailure, SitemapResolver,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Options for resolving a sitemap tree into a URL list
pub struct SitemapOptions {
    pub sitemap_url: String,
    pub resolver: ResolverConfig,
    pub show_progress_bars: bool,
}

/// Options for health-checking a URL list
pub struct CheckOptions {
    pub urls: Vec<String>,
    pub config: CheckerConfig,
    pub show_progress_bars: bool,
}

/// Callback for human-readable status lines (failed sitemaps, phase changes)
pub type StatusCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Resolve a sitemap into URL records.
///
/// Recursive mode walks index documents up to `max_depth`; otherwise only the
/// root document is read. Unreachable or malformed sitemaps are reported
/// through `status_callback` and recorded in the returned failures.
pub async fn execute_resolve(
    options: SitemapOptions,
    status_callback: Option<StatusCallback>,
) -> Result<Resolution> {
    let SitemapOptions {
        sitemap_url,
        resolver: config,
        show_progress_bars,
    } = options;

    let resolver = SitemapResolver::new(&config).context("Failed to build sitemap client")?;

    let spinner = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .context("Invalid spinner template")?,
        );
        pb.set_message(format!("Resolving {}...", sitemap_url));
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let resolution = if config.recursive {
        resolver
            .resolve_entries(&sitemap_url, config.max_depth)
            .await
    } else {
        match resolver.extract_flat_entries(&sitemap_url).await {
            Ok(entries) => Resolution {
                entries,
                sitemaps_visited: 1,
                failures: Vec::new(),
            },
            Err(e) => Resolution {
                entries: Vec::new(),
                sitemaps_visited: 1,
                failures: vec![SitemapFailure {
                    url: sitemap_url.clone(),
                    depth: 0,
                    reason: e.to_string(),
                }],
            },
        }
    };

    if let Some(ref pb) = spinner {
        pb.finish_with_message(format!(
            "Found {} URLs in {} sitemap(s)",
            resolution.entries.len(),
            resolution.sitemaps_visited
        ));
    }

    if let Some(ref callback) = status_callback {
        for failure in &resolution.failures {
            callback(format!("[!]  Skipped sitemap {}: {}", failure.url, failure.reason));
        }
    }

    Ok(resolution)
}

/// Health-check every URL with the network probe.
pub async fn execute_check(
    options: CheckOptions,
    status_callback: Option<StatusCallback>,
) -> Result<Vec<ProbeResult>> {
    let probe = HealthProbe::from_config(&options.config).context("Failed to build HTTP client")?;
    execute_check_with(options, Arc::new(probe), status_callback).await
}

/// Health-check every URL with the given probe, drawing a progress bar when
/// enabled.
pub async fn execute_check_with<P: Probe>(
    options: CheckOptions,
    probe: Arc<P>,
    status_callback: Option<StatusCallback>,
) -> Result<Vec<ProbeResult>> {
    let CheckOptions {
        urls,
        config,
        show_progress_bars,
    } = options;

    if urls.is_empty() {
        bail!("No URLs to check");
    }

    let sampled = sitepulse_scanner::scheduler::sample(urls, config.sampling_rate());
    if let Some(ref callback) = status_callback {
        callback(format!(
            "Checking {} URLs with {} workers",
            sampled.len(),
            config.max_workers()
        ));
    }

    let mut scheduler = BatchScheduler::new(config);

    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new(sampled.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
                .context("Invalid progress bar template")?
                .progress_chars("=> "),
        );
        pb.set_message("Checking URLs...");

        let pb_clone = pb.clone();
        let callback: ProgressCallback = Arc::new(move |progress: Progress| {
            pb_clone.set_position(progress.processed as u64);
        });
        scheduler = scheduler.with_progress_callback(callback);
        Some(pb)
    } else {
        None
    };

    let results = scheduler.run_sampled(sampled, probe).await;

    if let Some(ref pb) = progress_bar {
        let healthy = results.iter().filter(|r| r.is_healthy()).count();
        pb.finish_with_message(format!(
            "Check complete! {}/{} healthy",
            healthy,
            results.len()
        ));
    }

    info!("Check run produced {} results", results.len());
    Ok(results)
}
