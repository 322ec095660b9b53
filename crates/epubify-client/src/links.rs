use std::collections::HashSet;

use epubify_core::config::{ConversionConfig, DEFAULT_MAX_PAGES};
use epubify_core::converter::validate_seed_url;
use epubify_core::error::AppError;
use epubify_core::traits::{Fetcher, LinkExtractor};
use scraper::{ElementRef, Selector};
use url::Url;

use crate::dom::Page;

/// Navigation regions commonly used by documentation generators, most
/// specific first. Only the first selector that matches is used.
const NAV_SELECTORS: &[&str] = &[
    ".toc",
    "#toc",
    ".table-of-contents",
    "#table-of-contents",
    "nav.sidebar",
    ".sidebar nav",
    ".sidebar",
    "#sidebar",
    ".sidenav",
    "aside nav",
    "[role='navigation']",
    "[role='tree']",
    "[role='menu']",
    "nav",
];

const SKIPPED_EXTENSIONS: &[&str] = &[
    ".pdf", ".zip", ".tar.gz", ".tgz", ".gz", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp",
    ".ico", ".css", ".js",
];

const API_SEGMENTS: &[&str] = &["api", "apireference", "api-reference", "api_reference"];

/// Decides which discovered URLs belong to the documentation set.
#[derive(Debug, Clone)]
pub struct LinkPolicy {
    domains: Vec<String>,
}

impl LinkPolicy {
    /// The domain family is the seed's host plus any extra domains.
    pub fn new(seed: &Url, extra_domains: &[String]) -> Self {
        let mut domains: Vec<String> = seed
            .host_str()
            .map(|h| vec![h.to_ascii_lowercase()])
            .unwrap_or_default();
        for domain in extra_domains {
            let domain = domain.trim().trim_start_matches('.').to_ascii_lowercase();
            if !domain.is_empty() && !domains.contains(&domain) {
                domains.push(domain);
            }
        }
        Self { domains }
    }

    pub fn allows(&self, url: &Url) -> bool {
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }

        let Some(host) = url.host_str().map(str::to_ascii_lowercase) else {
            return false;
        };
        let in_family = self
            .domains
            .iter()
            .any(|d| host == *d || host.ends_with(&format!(".{d}")));
        if !in_family {
            return false;
        }

        let path = url.path().to_ascii_lowercase();
        if SKIPPED_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
            return false;
        }

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let is_api = segments.iter().any(|s| API_SEGMENTS.contains(s));
        !is_api || segments.iter().any(|s| is_version_segment(s))
    }
}

/// `latest`, `current`, `stable`, `v1`, `v2.3`, `1.2`, `10.4.1` or `2024-01-31`.
fn is_version_segment(segment: &str) -> bool {
    if matches!(segment, "latest" | "current" | "stable") {
        return true;
    }

    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    let dotted = |s: &str| s.split('.').all(all_digits);

    if let Some(rest) = segment.strip_prefix('v') {
        return dotted(rest);
    }
    if segment.contains('.') {
        return dotted(segment);
    }

    let parts: Vec<&str> = segment.split('-').collect();
    matches!(parts.as_slice(), [y, m, d] if y.len() == 4 && m.len() == 2 && d.len() == 2
        && all_digits(y) && all_digits(m) && all_digits(d))
}

/// Ordered, duplicate-free list of candidate links.
struct LinkList {
    seen: HashSet<String>,
    links: Vec<String>,
}

impl LinkList {
    fn new() -> Self {
        Self {
            seen: HashSet::new(),
            links: Vec::new(),
        }
    }

    fn push(&mut self, url: String) {
        if self.seen.insert(url.clone()) {
            self.links.push(url);
        }
    }

    fn len(&self) -> usize {
        self.links.len()
    }

    fn extend_from(
        &mut self,
        root: ElementRef<'_>,
        anchors: &Selector,
        seed: &Url,
        policy: &LinkPolicy,
    ) {
        for href in root.select(anchors).filter_map(|a| a.value().attr("href")) {
            if let Some(url) = resolve_href(href, seed).filter(|u| policy.allows(u)) {
                self.push(url.to_string());
            }
        }
    }
}

fn resolve_href(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();
    let lower = href.to_ascii_lowercase();
    if href.is_empty()
        || href.starts_with('#')
        || lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
    {
        return None;
    }

    let mut url = base.join(href).ok()?;
    url.set_fragment(None);
    Some(url)
}

fn navigation_region(page: &Page) -> Option<(&'static str, ElementRef<'_>)> {
    NAV_SELECTORS
        .iter()
        .find_map(|css| page.select_first(css).map(|el| (*css, el)))
}

/// Collect candidate documentation links from an index page.
///
/// The seed comes first. Links are taken from the first navigation region
/// that matches; if that yields nothing beyond the seed, every anchor on
/// the page is considered instead. Fragments are dropped and duplicates
/// removed, keeping first-seen order.
pub fn collect_links(html: &str, seed: &Url, policy: &LinkPolicy) -> Vec<String> {
    let page = Page::parse(html);
    let Ok(anchors) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seed = seed.clone();
    seed.set_fragment(None);

    let mut links = LinkList::new();
    links.push(seed.to_string());

    if let Some((css, region)) = navigation_region(&page) {
        links.extend_from(region, &anchors, &seed, policy);
        tracing::debug!(selector = css, found = links.len() - 1, "Navigation region matched");
    }

    if links.len() == 1 {
        tracing::debug!(url = %seed, "No navigation links, scanning all anchors");
        links.extend_from(page.html().root_element(), &anchors, &seed, policy);
    }

    links.links
}

/// Link extractor for documentation index pages.
#[derive(Clone)]
pub struct DocLinkExtractor<F> {
    fetcher: F,
    allowed_domains: Vec<String>,
    max_pages: usize,
}

impl<F: Fetcher> DocLinkExtractor<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            allowed_domains: Vec::new(),
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    pub fn with_config(fetcher: F, config: &ConversionConfig) -> Self {
        Self {
            fetcher,
            allowed_domains: config.allowed_domains.clone(),
            max_pages: config.max_pages,
        }
    }
}

impl<F: Fetcher> LinkExtractor for DocLinkExtractor<F> {
    async fn extract_links(&self, seed_url: &str) -> Result<Vec<String>, AppError> {
        let seed = validate_seed_url(seed_url)?;
        let page = self.fetcher.fetch(seed.as_str()).await?;

        if !page.is_html() {
            tracing::warn!(
                url = %seed,
                content_type = page.content_type.as_deref().unwrap_or_default(),
                "Index page is not HTML, parsing anyway"
            );
        }

        let policy = LinkPolicy::new(&seed, &self.allowed_domains);
        let mut links = collect_links(&page.body, &seed, &policy);
        links.truncate(self.max_pages);

        tracing::info!(url = %seed, links = links.len(), "Extracted documentation links");
        Ok(links)
    }
}
