use serde::{Deserialize, Serialize};
use sitepulse_scanner::{ProbeResult, ProbeStatus};

/// Per-status counts over a finished check run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSummary {
    pub total: usize,
    pub healthy: usize,
    pub unhealthy: usize,
    pub ssl_errors: usize,
    pub connection_errors: usize,
    pub timeouts: usize,
    pub errors: usize,
    /// URLs whose host completed a verified TLS handshake
    pub ssl_valid: usize,
}

impl CheckSummary {
    pub fn from_results(results: &[ProbeResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };

        for result in results {
            match result.status {
                ProbeStatus::Healthy => summary.healthy += 1,
                ProbeStatus::Unhealthy => summary.unhealthy += 1,
                ProbeStatus::SslError => summary.ssl_errors += 1,
                ProbeStatus::ConnectionError => summary.connection_errors += 1,
                ProbeStatus::Timeout => summary.timeouts += 1,
                // Never returned by the scheduler; count it as a failure anyway
                ProbeStatus::Error | ProbeStatus::Unchecked => summary.errors += 1,
            }
            if result.ssl_valid {
                summary.ssl_valid += 1;
            }
        }

        summary
    }

    pub fn failed(&self) -> usize {
        self.total - self.healthy
    }

    pub fn all_healthy(&self) -> bool {
        self.failed() == 0
    }

    /// Share of healthy URLs, 0-100. An empty run counts as fully healthy.
    pub fn health_percentage(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.healthy as f64 * 100.0 / self.total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(status: ProbeStatus, ssl_valid: bool) -> ProbeResult {
        let mut r = ProbeResult::new("https://example.com".to_string());
        r.status = status;
        r.ssl_valid = ssl_valid;
        r
    }

    #[test]
    fn counts_every_status() {
        let results = vec![
            result(ProbeStatus::Healthy, true),
            result(ProbeStatus::Healthy, true),
            result(ProbeStatus::Unhealthy, true),
            result(ProbeStatus::SslError, false),
            result(ProbeStatus::ConnectionError, false),
            result(ProbeStatus::Timeout, false),
            result(ProbeStatus::Error, false),
        ];
        let summary = CheckSummary::from_results(&results);

        assert_eq!(summary.total, 7);
        assert_eq!(summary.healthy, 2);
        assert_eq!(summary.unhealthy, 1);
        assert_eq!(summary.ssl_errors, 1);
        assert_eq!(summary.connection_errors, 1);
        assert_eq!(summary.timeouts, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.ssl_valid, 3);
        assert_eq!(summary.failed(), 5);
        assert!(!summary.all_healthy());
    }

    #[test]
    fn empty_run_is_healthy() {
        let summary = CheckSummary::from_results(&[]);
        assert!(summary.all_healthy());
        assert_eq!(summary.health_percentage(), 100.0);
    }

    #[test]
    fn percentage() {
        let results = vec![
            result(ProbeStatus::Healthy, false),
            result(ProbeStatus::Timeout, false),
            result(ProbeStatus::Healthy, false),
            result(ProbeStatus::Unhealthy, false),
        ];
        assert_eq!(CheckSummary::from_results(&results).health_percentage(), 50.0);
    }
}
