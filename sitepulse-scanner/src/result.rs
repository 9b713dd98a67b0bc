use serde::{Deserialize, Serialize};
use std::fmt;

pub const UNKNOWN_HEADER: &str = "Unknown";

/// Terminal verdict of a probe. `Unchecked` only exists before the probe runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProbeStatus {
    Healthy,
    Unhealthy,
    #[serde(rename = "SSL Error")]
    SslError,
    #[serde(rename = "Connection Error")]
    ConnectionError,
    Timeout,
    Error,
    Unchecked,
}

impl ProbeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeStatus::Healthy => "Healthy",
            ProbeStatus::Unhealthy => "Unhealthy",
            ProbeStatus::SslError => "SSL Error",
            ProbeStatus::ConnectionError => "Connection Error",
            ProbeStatus::Timeout => "Timeout",
            ProbeStatus::Error => "Error",
            ProbeStatus::Unchecked => "Unchecked",
        }
    }

    /// Classification of a completed HTTP response.
    pub fn from_http_code(code: u16) -> Self {
        if (200..400).contains(&code) {
            ProbeStatus::Healthy
        } else {
            ProbeStatus::Unhealthy
        }
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub url: String,
    pub status: ProbeStatus,
    pub http_code: Option<u16>,
    pub redirect_chain: Vec<String>,
    pub ssl_valid: bool,
    /// Seconds, rounded to three decimals
    pub response_time: f64,
    pub content_type: String,
    pub server: String,
    pub error: Option<String>,
}

impl ProbeResult {
    pub fn new(url: String) -> Self {
        Self {
            url,
            status: ProbeStatus::Unchecked,
            http_code: None,
            redirect_chain: Vec::new(),
            ssl_valid: false,
            response_time: 0.0,
            content_type: UNKNOWN_HEADER.to_string(),
            server: UNKNOWN_HEADER.to_string(),
            error: None,
        }
    }

    pub fn with_error(url: String, status: ProbeStatus, error: String) -> Self {
        Self {
            status,
            error: Some(error),
            ..Self::new(url)
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == ProbeStatus::Healthy
    }

    /// Final location after redirects, falling back to the requested URL.
    pub fn final_url(&self) -> &str {
        self.redirect_chain.last().map(String::as_str).unwrap_or(&self.url)
    }
}

/// Round a duration in seconds to millisecond precision.
pub fn round_secs(secs: f64) -> f64 {
    (secs * 1000.0).round() / 1000.0
}

/// One `<url>` record of a URL set document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlEntry {
    pub loc: String,
    pub lastmod: Option<String>,
    pub changefreq: Option<String>,
    pub priority: Option<f32>,
}

impl UrlEntry {
    pub fn new(loc: impl Into<String>) -> Self {
        Self {
            loc: loc.into(),
            lastmod: None,
            changefreq: None,
            priority: None,
        }
    }
}
