use clap::ArgMatches;
use colored::Colorize;
use sitepulse_core::report::{render_check_report, render_sitemap_report};
use sitepulse_core::{
    CheckOptions, CheckSummary, ReportFormat, SitemapOptions, StatusCallback, execute_check,
    execute_resolve, save_report,
};
use sitepulse_scanner::{CheckerConfig, ResolverConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Level;
use url::Url;

pub const EXIT_OK: i32 = 0;
pub const EXIT_INPUT_ERROR: i32 = 1;
pub const EXIT_UNHEALTHY: i32 = 2;

/// Where the URLs to check come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlSource {
    Sitemap(String),
    List(Vec<String>),
}

/// Install the stderr log subscriber. WARN by default, DEBUG when verbose.
pub fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    // A second call (tests) keeps the existing subscriber
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

// Helper functions for check handler

/// Pick the URL source: a URL list file, or a sitemap URL to resolve
pub fn load_urls_from_source(
    url: Option<&Url>,
    hosts_file: Option<&PathBuf>,
) -> Result<UrlSource, String> {
    if let Some(hosts_file_path) = hosts_file {
        load_urls_from_file(hosts_file_path).map(UrlSource::List)
    } else if let Some(url) = url {
        Ok(UrlSource::Sitemap(url.as_str().to_string()))
    } else {
        Err("Either --url or --hosts-file must be provided".to_string())
    }
}

/// Load and parse URLs from a file, skipping blanks and `#` comments
pub fn load_urls_from_file(path: &PathBuf) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read URL file {}: {}", path.display(), e))?;

    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(parse_url_line)
        .collect();

    if urls.is_empty() {
        return Err(format!("No valid URLs found in {}", path.display()));
    }

    Ok(urls)
}

/// Parse a single line as a URL, trying to add https:// if needed
pub fn parse_url_line(line: &str) -> Option<String> {
    if let Ok(url) = Url::parse(line)
        && matches!(url.scheme(), "http" | "https")
    {
        return Some(line.to_string());
    }

    let with_scheme = format!("https://{}", line);
    if let Ok(url) = Url::parse(&with_scheme)
        && url.host_str().is_some_and(|host| host.contains('.') || host == "localhost")
    {
        return Some(with_scheme);
    }

    eprintln!("⚠️  Skipping invalid URL '{}'", line);
    None
}

/// Expand `~` in a user supplied output path
pub fn expand_output_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).as_ref())
}

pub fn resolver_config_from_args(args: &ArgMatches) -> ResolverConfig {
    let defaults = ResolverConfig::default();
    ResolverConfig {
        max_depth: args
            .get_one::<u64>("max-depth")
            .map(|d| *d as usize)
            .unwrap_or(defaults.max_depth),
        recursive: !args.get_flag("no-recursive"),
        ..defaults
    }
}

pub fn checker_config_from_args(args: &ArgMatches) -> Result<CheckerConfig, String> {
    let workers = *args.get_one::<u64>("workers").unwrap_or(&10);
    let timeout = *args.get_one::<u64>("timeout").unwrap_or(&10);
    let rate = *args.get_one::<f64>("sampling-rate").unwrap_or(&1.0);
    let batch = *args.get_one::<u64>("batch-size").unwrap_or(&0);

    CheckerConfig::builder()
        .max_workers(workers as usize)
        .timeout_secs(timeout)
        .sampling_rate(rate)
        .batch_size(batch as usize)
        .build()
        .map_err(|e| e.to_string())
}

fn report_format(args: &ArgMatches) -> Result<ReportFormat, String> {
    let name = args
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("text");
    ReportFormat::from_str(name).ok_or_else(|| format!("Unknown report format '{}'", name))
}

/// Print the report, or save it when an output path was given
pub fn deliver_report(content: &str, output: Option<&PathBuf>) -> Result<(), String> {
    match output {
        Some(path) => {
            let path = expand_output_path(path);
            save_report(content, &path).map_err(|e| format!("{:#}", e))?;
            println!(
                "{} Report saved to {}",
                "✓".green().bold(),
                path.display().to_string().bright_white()
            );
            Ok(())
        }
        None => {
            print!("{}", content);
            Ok(())
        }
    }
}

/// Exit status of a finished check run
pub fn exit_code(summary: &CheckSummary, fail_on_unhealthy: bool) -> i32 {
    if fail_on_unhealthy && !summary.all_healthy() {
        EXIT_UNHEALTHY
    } else {
        EXIT_OK
    }
}

fn status_printer(quiet: bool) -> Option<StatusCallback> {
    if quiet {
        None
    } else {
        Some(Arc::new(|msg: String| eprintln!("{}", msg)))
    }
}

pub async fn handle_extract(sub_matches: &ArgMatches, quiet: bool) -> i32 {
    let Some(url) = sub_matches.get_one::<Url>("url") else {
        eprintln!("✗ --url is required");
        return EXIT_INPUT_ERROR;
    };
    let output = sub_matches.get_one::<PathBuf>("output");
    let format = match report_format(sub_matches) {
        Ok(format) => format,
        Err(e) => {
            eprintln!("✗ {}", e);
            return EXIT_INPUT_ERROR;
        }
    };
    let resolver = resolver_config_from_args(sub_matches);

    if !quiet {
        eprintln!("\n🗺️  Extracting URLs from {}", url);
        eprintln!(
            "Recursive: {}",
            if resolver.recursive {
                format!("yes (max depth {})", resolver.max_depth)
            } else {
                "no".to_string()
            }
        );
        eprintln!();
    }

    let options = SitemapOptions {
        sitemap_url: url.as_str().to_string(),
        resolver,
        show_progress_bars: !quiet,
    };
    let resolution = match execute_resolve(options, status_printer(quiet)).await {
        Ok(resolution) => resolution,
        Err(e) => {
            eprintln!("✗ Extraction failed: {:#}", e);
            return EXIT_INPUT_ERROR;
        }
    };

    if resolution.entries.is_empty() {
        eprintln!("✗ No URLs found in {}", url);
        return EXIT_INPUT_ERROR;
    }

    if output.is_some() {
        colored::control::set_override(false);
    }
    let report = match render_sitemap_report(format, &resolution) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("✗ Failed to render report: {:#}", e);
            return EXIT_INPUT_ERROR;
        }
    };

    match deliver_report(&report, output) {
        Ok(()) => EXIT_OK,
        Err(e) => {
            eprintln!("✗ {}", e);
            EXIT_INPUT_ERROR
        }
    }
}

pub async fn handle_check(sub_matches: &ArgMatches, quiet: bool) -> i32 {
    let url = sub_matches.get_one::<Url>("url");
    let hosts_file = sub_matches.get_one::<PathBuf>("hosts-file");
    let output = sub_matches.get_one::<PathBuf>("output");
    let fail_on_unhealthy = sub_matches.get_flag("fail-on-unhealthy");

    let source = match load_urls_from_source(url, hosts_file) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("✗ {}", e);
            return EXIT_INPUT_ERROR;
        }
    };
    let (config, format) = match (checker_config_from_args(sub_matches), report_format(sub_matches))
    {
        (Ok(config), Ok(format)) => (config, format),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("✗ {}", e);
            return EXIT_INPUT_ERROR;
        }
    };

    let urls = match source {
        UrlSource::List(urls) => urls,
        UrlSource::Sitemap(sitemap_url) => {
            let options = SitemapOptions {
                sitemap_url: sitemap_url.clone(),
                resolver: resolver_config_from_args(sub_matches),
                show_progress_bars: !quiet,
            };
            match execute_resolve(options, status_printer(quiet)).await {
                Ok(resolution) if !resolution.entries.is_empty() => resolution.urls(),
                Ok(_) => {
                    eprintln!("✗ No URLs found in {}", sitemap_url);
                    return EXIT_INPUT_ERROR;
                }
                Err(e) => {
                    eprintln!("✗ Sitemap resolution failed: {:#}", e);
                    return EXIT_INPUT_ERROR;
                }
            }
        }
    };

    if !quiet {
        eprintln!("\n🩺 Checking {} URL(s)", urls.len());
        eprintln!("Workers: {}", config.max_workers());
        eprintln!("Timeout: {}s", config.timeout().as_secs());
        eprintln!("Sampling rate: {}", config.sampling_rate());
        match config.batch_size() {
            Some(size) => eprintln!("Batch size: {}\n", size),
            None => eprintln!("Batch size: unlimited\n"),
        }
    }

    let options = CheckOptions {
        urls,
        config,
        show_progress_bars: !quiet,
    };
    let results = match execute_check(options, status_printer(quiet)).await {
        Ok(results) => results,
        Err(e) => {
            eprintln!("✗ Check failed: {:#}", e);
            return EXIT_INPUT_ERROR;
        }
    };

    if output.is_some() {
        colored::control::set_override(false);
    }
    let report = match render_check_report(format, &results) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("✗ Failed to render report: {:#}", e);
            return EXIT_INPUT_ERROR;
        }
    };
    if let Err(e) = deliver_report(&report, output) {
        eprintln!("✗ {}", e);
        return EXIT_INPUT_ERROR;
    }

    let summary = CheckSummary::from_results(&results);
    if !quiet {
        eprintln!(
            "\n{} {}/{} URLs healthy",
            if summary.all_healthy() {
                "✓".green().bold()
            } else {
                "✗".red().bold()
            },
            summary.healthy,
            summary.total
        );
    }

    exit_code(&summary, fail_on_unhealthy)
}
