//! Namespaced sitemap XML parsing.
//!
//! A document is classified by its root element: anything whose local name
//! contains `sitemapindex` is an index of child sitemaps, everything else is
//! read as a `urlset`. The root must live in the sitemaps.org 0.9 namespace.

use crate::error::{Result, ScanError};
use crate::result::UrlEntry;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;

pub const SITEMAP_NAMESPACE: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

#[derive(Debug, Clone, PartialEq)]
pub enum SitemapDocument {
    /// Locations of child sitemap documents, in document order
    Index(Vec<String>),
    /// Content URL records, in document order
    UrlSet(Vec<UrlEntry>),
}

impl SitemapDocument {
    pub fn is_index(&self) -> bool {
        matches!(self, SitemapDocument::Index(_))
    }

    /// Every `<loc>` of the document regardless of its kind.
    pub fn locations(&self) -> Vec<String> {
        match self {
            SitemapDocument::Index(children) => children.clone(),
            SitemapDocument::UrlSet(entries) => entries.iter().map(|e| e.loc.clone()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Index,
    UrlSet,
}

impl Kind {
    fn item_tag(self) -> &'static [u8] {
        match self {
            Kind::Index => b"sitemap",
            Kind::UrlSet => b"url",
        }
    }
}

fn in_sitemap_namespace(ns: &ResolveResult) -> bool {
    matches!(ns, ResolveResult::Bound(Namespace(uri)) if *uri == SITEMAP_NAMESPACE.as_bytes())
}

fn root_kind(ns: &ResolveResult, start: &BytesStart) -> Result<Kind> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    if !in_sitemap_namespace(ns) {
        return Err(ScanError::MissingNamespace(name));
    }
    if name.contains("sitemapindex") {
        Ok(Kind::Index)
    } else {
        Ok(Kind::UrlSet)
    }
}

pub fn parse(bytes: &[u8]) -> Result<SitemapDocument> {
    let mut reader = NsReader::from_reader(bytes);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut kind: Option<Kind> = None;
    let mut depth = 0usize;
    let mut text = String::new();
    let mut item: Option<UrlEntry> = None;

    let mut children = Vec::new();
    let mut entries = Vec::new();

    loop {
        match reader.read_resolved_event_into(&mut buf)? {
            (ns, Event::Start(start)) => {
                depth += 1;
                text.clear();
                match kind {
                    None => kind = Some(root_kind(&ns, &start)?),
                    Some(k) => {
                        if in_sitemap_namespace(&ns) && start.local_name().as_ref() == k.item_tag()
                        {
                            item = Some(UrlEntry::new(String::new()));
                        }
                    }
                }
            }
            (ns, Event::Empty(start)) => {
                if kind.is_none() {
                    kind = Some(root_kind(&ns, &start)?);
                }
            }
            (_, Event::Text(content)) => text.push_str(&content.unescape()?),
            (_, Event::CData(content)) => {
                text.push_str(&String::from_utf8_lossy(&content.into_inner()));
            }
            (ns, Event::End(end)) => {
                depth = depth.saturating_sub(1);
                if let Some(k) = kind
                    && in_sitemap_namespace(&ns)
                {
                    let local = end.local_name();
                    let value = text.trim();

                    if local.as_ref() == k.item_tag() {
                        if let Some(finished) = item.take()
                            && !finished.loc.is_empty()
                        {
                            match k {
                                Kind::Index => children.push(finished.loc),
                                Kind::UrlSet => entries.push(finished),
                            }
                        }
                    } else if let Some(current) = item.as_mut() {
                        match local.as_ref() {
                            b"loc" => current.loc = value.to_string(),
                            b"lastmod" if !value.is_empty() => {
                                current.lastmod = Some(value.to_string())
                            }
                            b"changefreq" if !value.is_empty() => {
                                current.changefreq = Some(value.to_string())
                            }
                            b"priority" => current.priority = value.parse().ok(),
                            _ => {}
                        }
                    }
                }
                text.clear();
            }
            (_, Event::Eof) => break,
            _ => {}
        }
        buf.clear();
    }

    if depth != 0 {
        return Err(ScanError::ParseError(
            "document ended before the root element was closed".to_string(),
        ));
    }

    match kind {
        Some(Kind::Index) => Ok(SitemapDocument::Index(children)),
        Some(Kind::UrlSet) => Ok(SitemapDocument::UrlSet(entries)),
        None => Err(ScanError::ParseError("document has no root element".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URLSET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url>
    <loc>https://example.com/</loc>
    <lastmod>2024-01-15</lastmod>
    <changefreq>daily</changefreq>
    <priority>1.0</priority>
  </url>
  <url>
    <loc>
      https://example.com/about?a=1&amp;b=2
    </loc>
  </url>
  <url><loc><![CDATA[https://example.com/cdata]]></loc><priority>high</priority></url>
</urlset>"#;

    #[test]
    fn parses_urlset_with_metadata() {
        let doc = parse(URLSET.as_bytes()).unwrap();
        let SitemapDocument::UrlSet(entries) = doc else {
            panic!("expected a urlset");
        };

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].loc, "https://example.com/");
        assert_eq!(entries[0].lastmod.as_deref(), Some("2024-01-15"));
        assert_eq!(entries[0].changefreq.as_deref(), Some("daily"));
        assert_eq!(entries[0].priority, Some(1.0));
        assert_eq!(entries[1].loc, "https://example.com/about?a=1&b=2");
        assert_eq!(entries[1].lastmod, None);
        assert_eq!(entries[2].loc, "https://example.com/cdata");
        assert_eq!(entries[2].priority, None);
    }

    #[test]
    fn parses_sitemap_index() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>https://example.com/posts.xml</loc><lastmod>2024-01-01</lastmod></sitemap>
  <sitemap><loc>https://example.com/pages.xml</loc></sitemap>
</sitemapindex>"#;

        let doc = parse(xml.as_bytes()).unwrap();
        assert!(doc.is_index());
        assert_eq!(
            doc.locations(),
            vec![
                "https://example.com/posts.xml".to_string(),
                "https://example.com/pages.xml".to_string(),
            ]
        );
    }

    #[test]
    fn prefixed_namespace_is_accepted() {
        let xml = r#"<sm:urlset xmlns:sm="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sm:url><sm:loc>https://example.com/a</sm:loc></sm:url>
</sm:urlset>"#;

        let doc = parse(xml.as_bytes()).unwrap();
        assert_eq!(doc.locations(), vec!["https://example.com/a".to_string()]);
    }

    #[test]
    fn foreign_elements_are_ignored() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"
        xmlns:image="http://www.google.com/schemas/sitemap-image/1.1">
  <url>
    <loc>https://example.com/gallery</loc>
    <image:image><image:loc>https://example.com/cat.jpg</image:loc></image:image>
  </url>
</urlset>"#;

        let doc = parse(xml.as_bytes()).unwrap();
        assert_eq!(doc.locations(), vec!["https://example.com/gallery".to_string()]);
    }

    #[test]
    fn missing_namespace_is_rejected() {
        let xml = "<urlset><url><loc>https://example.com/</loc></url></urlset>";
        let err = parse(xml.as_bytes()).unwrap_err();
        assert!(matches!(err, ScanError::MissingNamespace(ref name) if name == "urlset"));
    }

    #[test]
    fn malformed_xml_is_rejected() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"><url></urlset>"#;
        assert!(parse(xml.as_bytes()).unwrap_err().is_parse_error());
    }

    #[test]
    fn truncated_document_is_rejected() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"><url><loc>x</loc></url>"#;
        assert!(parse(xml.as_bytes()).is_err());
    }

    #[test]
    fn html_page_is_not_a_sitemap() {
        let err = parse(b"<html><body>Not found</body></html>").unwrap_err();
        assert!(err.is_parse_error());
    }

    #[test]
    fn empty_urlset_and_empty_input() {
        let doc = parse(br#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"/>"#).unwrap();
        assert_eq!(doc, SitemapDocument::UrlSet(Vec::new()));

        assert!(parse(b"").is_err());
    }

    #[test]
    fn entries_without_loc_are_skipped() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><lastmod>today</lastmod></url>
  <url><loc>https://example.com/kept</loc></url>
</urlset>"#;

        let doc = parse(xml.as_bytes()).unwrap();
        assert_eq!(doc.locations(), vec!["https://example.com/kept".to_string()]);
    }
}
