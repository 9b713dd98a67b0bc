use crate::result::ProbeStatus;
use std::io::ErrorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Fetching {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Malformed sitemap XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Root element <{0}> is not in the sitemap namespace")]
    MissingNamespace(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("TLS setup error: {0}")]
    Tls(#[from] rustls::Error),
}

impl ScanError {
    /// True for failures that come from parsing a fetched document rather than
    /// from retrieving it.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            ScanError::Xml(_) | ScanError::ParseError(_) | ScanError::MissingNamespace(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;

/// Failure of the HTTP stage of a probe. Each variant is one terminal status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("SSL error: {0}")]
    Ssl(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timed out")]
    Timeout,

    #[error("{0}")]
    Other(String),
}

impl ProbeError {
    pub fn status(&self) -> ProbeStatus {
        match self {
            ProbeError::Ssl(_) => ProbeStatus::SslError,
            ProbeError::Connection(_) => ProbeStatus::ConnectionError,
            ProbeError::Timeout => ProbeStatus::Timeout,
            ProbeError::Other(_) => ProbeStatus::Error,
        }
    }

    /// Map a reqwest failure into the probe taxonomy. TLS problems are checked
    /// first since reqwest also reports them as connect errors. A connection
    /// dropped by the peer after connecting still counts as a connection error.
    pub fn classify(error: &reqwest::Error) -> Self {
        let chain = error_chain(error);
        // The top-level message embeds the request URL, so only the causes
        // are inspected for TLS markers.
        let causes = std::error::Error::source(error)
            .map(error_chain)
            .unwrap_or_default();

        if looks_like_tls(&causes) {
            ProbeError::Ssl(chain)
        } else if error.is_connect() || has_connection_io_error(error) {
            ProbeError::Connection(chain)
        } else if error.is_timeout() {
            ProbeError::Timeout
        } else {
            ProbeError::Other(chain)
        }
    }
}

fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

fn has_connection_io_error(error: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(err) = current {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::ConnectionRefused
                    | ErrorKind::BrokenPipe
                    | ErrorKind::NotConnected
            ) {
                return true;
            }
        }
        current = err.source();
    }
    false
}

fn looks_like_tls(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["ssl", "tls", "certificate", "handshake"]
        .iter()
        .any(|needle| lower.contains(needle))
}
