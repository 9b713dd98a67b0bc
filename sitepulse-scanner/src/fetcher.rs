use crate::config::DEFAULT_FETCH_TIMEOUT_SECS;
use crate::error::{Result, ScanError};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

pub const SITEMAP_USER_AGENT: &str = concat!(
    "Sitepulse/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/trapdoorsec/sitepulse)"
);

/// Retrieves raw sitemap documents. Certificate verification is disabled so
/// sites with broken TLS can still be audited.
#[derive(Clone)]
pub struct SitemapFetcher {
    client: Client,
}

impl SitemapFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(SITEMAP_USER_AGENT)
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self { client })
    }

    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        debug!("Fetching sitemap {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| ScanError::Fetch {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|source| ScanError::Fetch {
            url: url.to_string(),
            source,
        })?;

        debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    #[tokio::test]
    async fn fetch_returns_body_bytes() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"<urlset/>".to_vec()))
            .mount(&mock_server)
            .await;

        let fetcher = SitemapFetcher::new().unwrap();
        let body = fetcher
            .fetch(&format!("{}/sitemap.xml", mock_server.uri()))
            .await
            .unwrap();

        assert_eq!(body, b"<urlset/>");
    }

    #[tokio::test]
    async fn fetch_reports_error_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let fetcher = SitemapFetcher::new().unwrap();
        let err = fetcher
            .fetch(&format!("{}/missing.xml", mock_server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::HttpStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn fetch_reports_transport_failure() {
        let fetcher = SitemapFetcher::with_timeout(Duration::from_secs(2)).unwrap();
        let err = fetcher
            .fetch("http://127.0.0.1:1/sitemap.xml")
            .await
            .unwrap_err();

        match err {
            ScanError::Fetch { url, .. } => assert_eq!(url, "http://127.0.0.1:1/sitemap.xml"),
            other => panic!("expected fetch error, got {other:?}"),
        }
    }
}
