use crate::config::ResolverConfig;
use crate::error::Result;
use crate::fetcher::SitemapFetcher;
use crate::parser::{self, SitemapDocument};
use crate::result::UrlEntry;
use futures::future::{BoxFuture, FutureExt};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// A sitemap node that could not be fetched or parsed. It contributed no URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapFailure {
    pub url: String,
    pub depth: usize,
    pub reason: String,
}

/// Outcome of walking a sitemap tree
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Deduplicated URL records, first occurrence wins
    pub entries: Vec<UrlEntry>,
    pub sitemaps_visited: usize,
    pub failures: Vec<SitemapFailure>,
}

impl Resolution {
    pub fn urls(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.loc.clone()).collect()
    }
}

/// Partial result of one subtree. Each recursive call builds its own and the
/// caller folds it into the parent's.
#[derive(Debug, Default)]
struct Subtree {
    entries: Vec<UrlEntry>,
    visited: usize,
    failures: Vec<SitemapFailure>,
}

impl Subtree {
    fn visited() -> Self {
        Self {
            visited: 1,
            ..Self::default()
        }
    }

    fn failed(url: String, depth: usize, reason: String) -> Self {
        Self {
            visited: 1,
            failures: vec![SitemapFailure { url, depth, reason }],
            ..Self::default()
        }
    }

    fn absorb(&mut self, child: Subtree) {
        self.entries.extend(child.entries);
        self.visited += child.visited;
        self.failures.extend(child.failures);
    }
}

#[derive(Clone)]
pub struct SitemapResolver {
    fetcher: SitemapFetcher,
}

impl SitemapResolver {
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        Ok(Self::with_fetcher(SitemapFetcher::with_timeout(
            config.fetch_timeout,
        )?))
    }

    pub fn with_fetcher(fetcher: SitemapFetcher) -> Self {
        Self { fetcher }
    }

    async fn load(&self, url: &str) -> Result<SitemapDocument> {
        let body = self.fetcher.fetch(url).await?;
        parser::parse(&body)
    }

    /// Deduplicated content URLs reachable from `root` through at most
    /// `max_depth` levels of sitemap indexes. Depth 0 is the root itself.
    pub async fn resolve(&self, root: &str, max_depth: usize) -> Vec<String> {
        self.resolve_entries(root, max_depth).await.urls()
    }

    pub async fn resolve_entries(&self, root: &str, max_depth: usize) -> Resolution {
        info!("Resolving sitemap {} (max depth {})", root, max_depth);

        let subtree = self.resolve_node(root.to_string(), 0, max_depth).await;
        let collected = subtree.entries.len();
        let entries = dedup_entries(subtree.entries);

        info!(
            "Resolved {} unique URLs ({} before dedup) from {} sitemaps, {} failed",
            entries.len(),
            collected,
            subtree.visited,
            subtree.failures.len()
        );

        Resolution {
            entries,
            sitemaps_visited: subtree.visited,
            failures: subtree.failures,
        }
    }

    fn resolve_node(&self, url: String, depth: usize, max_depth: usize) -> BoxFuture<'_, Subtree> {
        async move {
            let document = match self.load(&url).await {
                Ok(document) => document,
                Err(e) => {
                    warn!("Skipping sitemap {} at depth {}: {}", url, depth, e);
                    return Subtree::failed(url, depth, e.to_string());
                }
            };

            let mut subtree = Subtree::visited();
            match document {
                SitemapDocument::UrlSet(entries) => {
                    debug!("{} lists {} URLs", url, entries.len());
                    subtree.entries = entries;
                }
                SitemapDocument::Index(children) if depth < max_depth => {
                    debug!("{} indexes {} sitemaps", url, children.len());
                    for child in children {
                        subtree.absorb(self.resolve_node(child, depth + 1, max_depth).await);
                    }
                }
                SitemapDocument::Index(children) => {
                    debug!(
                        "Depth limit reached at {}, not following {} child sitemaps",
                        url,
                        children.len()
                    );
                }
            }
            subtree
        }
        .boxed()
    }

    /// Non-recursive extraction: every `<loc>` of the root document, whether
    /// it lists pages or child sitemaps.
    pub async fn extract_flat(&self, root: &str) -> Result<Vec<String>> {
        let document = self.load(root).await?;
        Ok(dedup_urls(document.locations()))
    }

    /// Like [`extract_flat`](Self::extract_flat), keeping URL set metadata.
    /// Child sitemaps of an index come back as bare entries.
    pub async fn extract_flat_entries(&self, root: &str) -> Result<Vec<UrlEntry>> {
        let entries = match self.load(root).await? {
            SitemapDocument::UrlSet(entries) => entries,
            SitemapDocument::Index(children) => children.into_iter().map(UrlEntry::new).collect(),
        };
        Ok(dedup_entries(entries))
    }
}

pub fn dedup_entries(entries: Vec<UrlEntry>) -> Vec<UrlEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| seen.insert(entry.loc.clone()))
        .collect()
}

pub fn dedup_urls(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter().filter(|url| seen.insert(url.clone())).collect()
}
