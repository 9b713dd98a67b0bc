pub mod config;
pub mod error;
pub mod fetcher;
pub mod parser;
pub mod probe;
pub mod resolver;
pub mod result;
pub mod scheduler;

pub use config::{CheckerConfig, ResolverConfig};
pub use error::{ProbeError, ScanError};
pub use fetcher::SitemapFetcher;
pub use parser::SitemapDocument;
pub use probe::{HealthProbe, Probe};
pub use resolver::{Resolution, SitemapFailure, SitemapResolver};
pub use result::{ProbeResult, ProbeStatus, UrlEntry};
pub use scheduler::{BatchScheduler, Progress, ProgressCallback};
