use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;

pub const DEFAULT_MAX_PAGES: usize = 100;
pub const DEFAULT_MIN_CONTENT_LENGTH: usize = 100;
pub const DEFAULT_TITLE: &str = "Documentation";
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Knobs shared by the link extractor, content extractor and orchestrator.
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    /// Upper bound on candidate links (and therefore fetches) per job.
    pub max_pages: usize,
    /// Cleaned article bodies shorter than this (in characters) are skipped.
    pub min_content_length: usize,
    /// Book title used when a job does not request one.
    pub default_title: String,
    /// Extra domains accepted by the link filter besides the seed's host.
    pub allowed_domains: Vec<String>,
    pub fetch_timeout: Duration,
    /// Disable the private-address guard in the fetcher.
    pub allow_private_urls: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            min_content_length: DEFAULT_MIN_CONTENT_LENGTH,
            default_title: DEFAULT_TITLE.to_string(),
            allowed_domains: Vec::new(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            allow_private_urls: false,
        }
    }
}

impl ConversionConfig {
    /// Read configuration from environment variables, falling back to defaults.
    ///
    /// - `EPUBIFY_MAX_PAGES` (default 100)
    /// - `EPUBIFY_MIN_CONTENT_LENGTH` (default 100)
    /// - `EPUBIFY_DEFAULT_TITLE` (default "Documentation")
    /// - `EPUBIFY_ALLOWED_DOMAINS` (comma separated, default empty)
    /// - `EPUBIFY_FETCH_TIMEOUT_SECS` (default 30)
    /// - `EPUBIFY_ALLOW_PRIVATE_URLS` (default false)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).map(|raw| (key.to_string(), raw));

        let max_pages = positive(var("EPUBIFY_MAX_PAGES"))?.unwrap_or(defaults.max_pages);

        let allowed_domains = lookup("EPUBIFY_ALLOWED_DOMAINS")
            .map(|raw| parse_domain_list(&raw))
            .unwrap_or_default();

        let fetch_timeout = positive::<u64>(var("EPUBIFY_FETCH_TIMEOUT_SECS"))?
            .map(Duration::from_secs)
            .unwrap_or(defaults.fetch_timeout);

        Ok(Self {
            max_pages,
            min_content_length: parse_var(var("EPUBIFY_MIN_CONTENT_LENGTH"))?
                .unwrap_or(defaults.min_content_length),
            default_title: lookup("EPUBIFY_DEFAULT_TITLE")
                .filter(|t| !t.trim().is_empty())
                .unwrap_or(defaults.default_title),
            allowed_domains,
            fetch_timeout,
            allow_private_urls: parse_var(var("EPUBIFY_ALLOW_PRIVATE_URLS"))?
                .unwrap_or(defaults.allow_private_urls),
        })
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_min_content_length(mut self, min: usize) -> Self {
        self.min_content_length = min;
        self
    }

    pub fn with_allowed_domains(mut self, domains: Vec<String>) -> Self {
        self.allowed_domains = domains;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn allow_private_urls(mut self) -> Self {
        self.allow_private_urls = true;
        self
    }
}

/// Split a comma separated domain list, dropping blanks and leading dots.
pub fn parse_domain_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|d| d.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|d| !d.is_empty())
        .collect()
}

fn parse_var<T: FromStr>(var: Option<(String, String)>) -> Result<Option<T>, AppError> {
    match var {
        None => Ok(None),
        Some((key, raw)) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| AppError::ConfigError(format!("Invalid {key} '{raw}'"))),
    }
}

/// Parse a count that must be at least 1.
fn positive<T: FromStr + Default + PartialEq>(
    var: Option<(String, String)>,
) -> Result<Option<T>, AppError> {
    let key = var.as_ref().map(|(key, _)| key.clone());
    match (parse_var::<T>(var)?, key) {
        (Some(value), Some(key)) if value == T::default() => Err(AppError::ConfigError(format!(
            "{key} must be at least 1"
        ))),
        (value, _) => Ok(value),
    }
}
