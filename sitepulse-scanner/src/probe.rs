use crate::config::CheckerConfig;
use crate::error::{ProbeError, Result};
use crate::result::{ProbeResult, ProbeStatus, round_secs};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, LOCATION, SERVER};
use reqwest::{Client, redirect::Policy};
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::debug;
use url::{Host, Url};

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
pub const MAX_REDIRECTS: usize = 30;
pub const TLS_PORT: u16 = 443;

// Headroom for the stage guard so a connect attempt that runs out its own
// timeout is still reported as a connection failure.
const STAGE_GRACE: Duration = Duration::from_millis(500);

/// One complete health check of a single URL. The scheduler drives any
/// implementation of this, which keeps it testable without the network.
pub trait Probe: Send + Sync + 'static {
    fn probe(&self, url: &str) -> impl Future<Output = ProbeResult> + Send;
}

/// What the HTTP stage learned about the final response
#[derive(Debug)]
struct HttpOutcome {
    code: u16,
    redirect_chain: Vec<String>,
    elapsed: Duration,
    content_type: Option<String>,
    server: Option<String>,
}

/// HTTP GET with redirect following (certificate checks off), followed by an
/// independent, verified TLS handshake against the same host.
#[derive(Clone)]
pub struct HealthProbe {
    client: Client,
    tls: TlsConnector,
    timeout: Duration,
    tls_port: u16,
}

impl HealthProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        // Redirects are walked by hand so every hop lands in the chain
        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .connect_timeout(timeout)
            .danger_accept_invalid_certs(true)
            .redirect(Policy::none())
            .build()?;

        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        Ok(Self {
            client,
            tls: tls_connector(roots)?,
            timeout,
            tls_port: TLS_PORT,
        })
    }

    pub fn from_config(config: &CheckerConfig) -> Result<Self> {
        Self::new(config.timeout())
    }

    /// Port used by the TLS stage. Only tests should need anything but 443.
    pub fn with_tls_port(mut self, port: u16) -> Self {
        self.tls_port = port;
        self
    }

    /// Trust anchors for the TLS stage in place of the bundled Mozilla roots.
    pub fn with_root_certificates(mut self, roots: RootCertStore) -> Result<Self> {
        self.tls = tls_connector(roots)?;
        Ok(self)
    }

    pub async fn check(&self, url: &str) -> ProbeResult {
        let mut result = ProbeResult::new(url.to_string());

        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                result.status = ProbeStatus::Error;
                result.error = Some(format!("Invalid URL: {}", e));
                return result;
            }
        };

        match self.http_stage(parsed.clone()).await {
            Ok(outcome) => {
                result.status = ProbeStatus::from_http_code(outcome.code);
                result.http_code = Some(outcome.code);
                result.redirect_chain = outcome.redirect_chain;
                result.response_time = round_secs(outcome.elapsed.as_secs_f64());
                if let Some(content_type) = outcome.content_type {
                    result.content_type = content_type;
                }
                if let Some(server) = outcome.server {
                    result.server = server;
                }
            }
            Err(e) => {
                debug!("HTTP stage for {} failed: {}", url, e);
                result.status = e.status();
                result.error = Some(e.to_string());
            }
        }

        result.ssl_valid = match parsed.host() {
            Some(host) => self.tls_stage(host).await,
            None => false,
        };

        debug!(
            "Probed {}: {} (ssl_valid={})",
            url, result.status, result.ssl_valid
        );
        result
    }

    async fn http_stage(&self, url: Url) -> std::result::Result<HttpOutcome, ProbeError> {
        let deadline = self.timeout + STAGE_GRACE;
        match tokio::time::timeout(deadline, self.follow_redirects(url)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProbeError::Timeout),
        }
    }

    async fn follow_redirects(&self, url: Url) -> std::result::Result<HttpOutcome, ProbeError> {
        let start = Instant::now();
        let mut current = url;
        let mut redirect_chain = Vec::new();

        loop {
            let response = self
                .client
                .get(current.clone())
                .send()
                .await
                .map_err(|e| ProbeError::classify(&e))?;

            redirect_chain.push(response.url().to_string());
            let status = response.status();

            let next = if status.is_redirection() {
                header_value(response.headers(), &LOCATION)
                    .and_then(|location| current.join(&location).ok())
            } else {
                None
            };

            match next {
                Some(next) => {
                    if redirect_chain.len() > MAX_REDIRECTS {
                        return Err(ProbeError::Other(format!(
                            "Exceeded {} redirects",
                            MAX_REDIRECTS
                        )));
                    }
                    debug!("{} redirected ({}) to {}", current, status.as_u16(), next);
                    current = next;
                }
                None => {
                    return Ok(HttpOutcome {
                        code: status.as_u16(),
                        redirect_chain,
                        elapsed: start.elapsed(),
                        content_type: header_value(response.headers(), &CONTENT_TYPE),
                        server: header_value(response.headers(), &SERVER),
                    });
                }
            }
        }
    }

    /// True when a verified handshake on the TLS port completes and the
    /// server presented a certificate chain.
    async fn tls_stage(&self, host: Host<&str>) -> bool {
        let Some((server_name, host)) = tls_target(host) else {
            return false;
        };

        let handshake = async {
            let tcp = TcpStream::connect((host.as_str(), self.tls_port)).await?;
            let stream = self.tls.connect(server_name, tcp).await?;
            let (_, session) = stream.get_ref();
            Ok::<bool, std::io::Error>(
                session
                    .peer_certificates()
                    .is_some_and(|chain| !chain.is_empty()),
            )
        };

        match tokio::time::timeout(self.timeout, handshake).await {
            Ok(Ok(valid)) => valid,
            Ok(Err(e)) => {
                debug!("TLS handshake with {}:{} failed: {}", host, self.tls_port, e);
                false
            }
            Err(_) => {
                debug!("TLS handshake with {}:{} timed out", host, self.tls_port);
                false
            }
        }
    }
}

impl Probe for HealthProbe {
    async fn probe(&self, url: &str) -> ProbeResult {
        self.check(url).await
    }
}

fn tls_connector(roots: RootCertStore) -> Result<TlsConnector> {
    let config =
        ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
            .with_safe_default_protocol_versions()?
            .with_root_certificates(roots)
            .with_no_client_auth();
    Ok(TlsConnector::from(Arc::new(config)))
}

/// Server name to verify and the bare host to dial. IP literals are used as
/// addresses, never as DNS names.
fn tls_target(host: Host<&str>) -> Option<(ServerName<'static>, String)> {
    match host {
        Host::Domain(domain) => match ServerName::try_from(domain.to_string()) {
            Ok(name) => Some((name, domain.to_string())),
            Err(e) => {
                debug!("Cannot use {} as a TLS server name: {}", domain, e);
                None
            }
        },
        Host::Ipv4(ip) => Some((ServerName::from(IpAddr::V4(ip)), ip.to_string())),
        Host::Ipv6(ip) => Some((ServerName::from(IpAddr::V6(ip)), ip.to_string())),
    }
}

fn header_value(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_url_is_an_error_without_network() {
        let probe = HealthProbe::new(Duration::from_secs(5)).unwrap();
        let result = probe.check("not a url").await;

        assert_eq!(result.status, ProbeStatus::Error);
        assert!(result.error.unwrap().starts_with("Invalid URL"));
        assert!(!result.ssl_valid);
        assert!(result.http_code.is_none());
    }

    #[test]
    fn ipv6_literal_is_dialled_without_brackets() {
        let url = Url::parse("https://[::1]:8443/health").unwrap();
        let (name, host) = tls_target(url.host().unwrap()).unwrap();

        assert_eq!(host, "::1");
        assert_eq!(name, ServerName::from(IpAddr::V6(std::net::Ipv6Addr::LOCALHOST)));
    }

    #[test]
    fn domain_and_ipv4_hosts_become_server_names() {
        let url = Url::parse("https://example.com/").unwrap();
        let (name, host) = tls_target(url.host().unwrap()).unwrap();
        assert_eq!(host, "example.com");
        assert!(matches!(name, ServerName::DnsName(_)));

        let url = Url::parse("https://127.0.0.1/").unwrap();
        let (name, host) = tls_target(url.host().unwrap()).unwrap();
        assert_eq!(host, "127.0.0.1");
        assert!(matches!(name, ServerName::IpAddress(_)));
    }

    #[test]
    fn header_value_reads_present_headers_only() {
        let mut headers = HeaderMap::new();
        headers.insert(SERVER, "nginx".parse().unwrap());

        assert_eq!(header_value(&headers, &SERVER).as_deref(), Some("nginx"));
        assert_eq!(header_value(&headers, &CONTENT_TYPE), None);
    }
}
