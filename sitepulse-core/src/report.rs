// Report rendering for check results and resolved sitemaps

use crate::summary::CheckSummary;
use anyhow::{Context, Result};
use colored::{ColoredString, Colorize};
use serde::{Deserialize, Serialize};
use sitepulse_scanner::{ProbeResult, ProbeStatus, Resolution, UrlEntry};
use std::path::Path;

pub const GENERATOR: &str = "Sitepulse";
pub const REDIRECT_SEPARATOR: &str = " -> ";

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Csv,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "csv" => Some(ReportFormat::Csv),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Json => "json",
            ReportFormat::Csv => "csv",
        }
    }
}

/// One CSV row of a check run; field order is the column order.
#[derive(Debug, Serialize)]
struct CheckRow<'a> {
    url: &'a str,
    status: &'static str,
    http_code: Option<u16>,
    redirect_chain: String,
    ssl_valid: bool,
    response_time: f64,
    content_type: &'a str,
    server: &'a str,
    error: &'a str,
}

impl<'a> From<&'a ProbeResult> for CheckRow<'a> {
    fn from(result: &'a ProbeResult) -> Self {
        Self {
            url: &result.url,
            status: result.status.as_str(),
            http_code: result.http_code,
            redirect_chain: result.redirect_chain.join(REDIRECT_SEPARATOR),
            ssl_valid: result.ssl_valid,
            response_time: result.response_time,
            content_type: &result.content_type,
            server: &result.server,
            error: result.error.as_deref().unwrap_or(""),
        }
    }
}

#[derive(Debug, Serialize)]
struct SitemapRow<'a> {
    url: &'a str,
    lastmod: Option<&'a str>,
    changefreq: Option<&'a str>,
    priority: Option<f32>,
}

fn metadata() -> serde_json::Value {
    serde_json::json!({
        "generator": GENERATOR,
        "version": env!("CARGO_PKG_VERSION"),
        "generated_at": chrono::Utc::now().to_rfc3339(),
    })
}

fn colored_status(status: ProbeStatus) -> ColoredString {
    match status {
        ProbeStatus::Healthy => status.as_str().green(),
        ProbeStatus::Unhealthy => status.as_str().yellow(),
        ProbeStatus::Timeout => status.as_str().magenta(),
        ProbeStatus::Unchecked => status.as_str().dimmed(),
        ProbeStatus::SslError | ProbeStatus::ConnectionError | ProbeStatus::Error => {
            status.as_str().red()
        }
    }
}

// ============================================================================
// Check mode
// ============================================================================

pub fn generate_check_text_report(results: &[ProbeResult]) -> String {
    let summary = CheckSummary::from_results(results);
    let mut report = String::new();

    report.push_str(RULE);
    report.push_str("                          SITEPULSE HEALTH REPORT\n");
    report.push_str(RULE);
    report.push('\n');

    report.push_str("# Summary:\n");
    report.push_str(&format!("  URLs checked:       {}\n", summary.total));
    report.push_str(&format!(
        "  Healthy:            {} ({:.1}%)\n",
        summary.healthy,
        summary.health_percentage()
    ));
    report.push_str(&format!("  Unhealthy:          {}\n", summary.unhealthy));
    report.push_str(&format!("  SSL errors:         {}\n", summary.ssl_errors));
    report.push_str(&format!("  Connection errors:  {}\n", summary.connection_errors));
    report.push_str(&format!("  Timeouts:           {}\n", summary.timeouts));
    report.push_str(&format!("  Other errors:       {}\n", summary.errors));
    report.push_str(&format!("  Valid TLS:          {}\n", summary.ssl_valid));
    report.push('\n');
    report.push_str(RULE);
    report.push('\n');

    for result in results {
        let code = result
            .http_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "---".to_string());
        let tls = if result.ssl_valid {
            "TLS".green()
        } else {
            "TLS".red()
        };

        let mut line = format!(
            "  {:<16} {} {} {:>6.3}s  {}",
            colored_status(result.status),
            code,
            tls,
            result.response_time,
            result.url
        );

        if result.redirect_chain.len() > 1 {
            line.push_str(&format!(" {} {}", "->".cyan(), result.final_url()));
        }
        if let Some(ref error) = result.error {
            line.push_str(&format!(" {}", format!("({})", error).bright_black()));
        }

        report.push_str(&line);
        report.push('\n');
    }

    report
}

pub fn generate_check_json_report(results: &[ProbeResult]) -> Result<String> {
    let json_report = serde_json::json!({
        "metadata": metadata(),
        "summary": CheckSummary::from_results(results),
        "results": results,
    });

    serde_json::to_string_pretty(&json_report).context("Failed to serialize JSON report")
}

pub fn generate_check_csv_report(results: &[ProbeResult]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for result in results {
        writer
            .serialize(CheckRow::from(result))
            .with_context(|| format!("Failed to write CSV row for {}", result.url))?;
    }
    finish_csv(writer, CHECK_COLUMNS)
}

pub const CHECK_COLUMNS: &[&str] = &[
    "url",
    "status",
    "http_code",
    "redirect_chain",
    "ssl_valid",
    "response_time",
    "content_type",
    "server",
    "error",
];

pub fn render_check_report(format: ReportFormat, results: &[ProbeResult]) -> Result<String> {
    match format {
        ReportFormat::Text => Ok(generate_check_text_report(results)),
        ReportFormat::Json => generate_check_json_report(results),
        ReportFormat::Csv => generate_check_csv_report(results),
    }
}

// ============================================================================
// Sitemap mode
// ============================================================================

pub const SITEMAP_COLUMNS: &[&str] = &["url", "lastmod", "changefreq", "priority"];

pub fn generate_sitemap_text_report(resolution: &Resolution) -> String {
    let mut report = String::new();
    report.push_str(RULE);
    report.push_str("# Summary:\n");
    report.push_str(&format!("  Sitemaps read:   {}\n", resolution.sitemaps_visited));
    report.push_str(&format!("  Sitemaps failed: {}\n", resolution.failures.len()));
    report.push_str(&format!("  Unique URLs:     {}\n", resolution.entries.len()));
    report.push('\n');
    report.push_str(RULE);
    report.push('\n');

    for entry in &resolution.entries {
        let mut line = format!("  {}", entry.loc);
        if let Some(ref lastmod) = entry.lastmod {
            line.push_str(&format!(" {}", lastmod.bright_black()));
        }
        report.push_str(&line);
        report.push('\n');
    }

    if !resolution.failures.is_empty() {
        report.push('\n');
        report.push_str("## Failed sitemaps\n");
        for failure in &resolution.failures {
            report.push_str(&format!(
                "  {} {} {}\n",
                "✗".red(),
                failure.url,
                format!("({})", failure.reason).bright_black()
            ));
        }
    }

    report
}

pub fn generate_sitemap_json_report(resolution: &Resolution) -> Result<String> {
    let failures: Vec<_> = resolution
        .failures
        .iter()
        .map(|f| {
            serde_json::json!({
                "url": f.url,
                "depth": f.depth,
                "reason": f.reason,
            })
        })
        .collect();

    let json_report = serde_json::json!({
        "metadata": metadata(),
        "summary": {
            "total_urls": resolution.entries.len(),
            "sitemaps_visited": resolution.sitemaps_visited,
            "sitemaps_failed": resolution.failures.len(),
        },
        "results": resolution.entries,
        "failures": failures,
    });

    serde_json::to_string_pretty(&json_report).context("Failed to serialize JSON report")
}

pub fn generate_sitemap_csv_report(entries: &[UrlEntry]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for entry in entries {
        writer
            .serialize(SitemapRow {
                url: &entry.loc,
                lastmod: entry.lastmod.as_deref(),
                changefreq: entry.changefreq.as_deref(),
                priority: entry.priority,
            })
            .with_context(|| format!("Failed to write CSV row for {}", entry.loc))?;
    }
    finish_csv(writer, SITEMAP_COLUMNS)
}

pub fn render_sitemap_report(format: ReportFormat, resolution: &Resolution) -> Result<String> {
    match format {
        ReportFormat::Text => Ok(generate_sitemap_text_report(resolution)),
        ReportFormat::Json => generate_sitemap_json_report(resolution),
        ReportFormat::Csv => generate_sitemap_csv_report(&resolution.entries),
    }
}

/// Flush a serde-driven CSV writer. With no rows serde never writes the
/// header, so it is emitted by hand.
fn finish_csv(writer: csv::Writer<Vec<u8>>, columns: &[&str]) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV: {}", e.error()))?;

    if bytes.is_empty() {
        let mut header = csv::Writer::from_writer(Vec::new());
        header
            .write_record(columns)
            .context("Failed to write CSV header")?;
        let bytes = header
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush CSV: {}", e.error()))?;
        return String::from_utf8(bytes).context("CSV output is not UTF-8");
    }

    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

pub fn save_report(content: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}
