use std::future::Future;

use crate::error::AppError;
use crate::models::{Article, FetchedPage};

/// Fetches a page, preferring HTML over XML representations.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedPage, AppError>> + Send;
}

/// Discovers the ordered, deduplicated candidate pages reachable from a seed.
pub trait LinkExtractor: Send + Sync + Clone {
    /// The seed itself is the first element. Fails on invalid seed URLs and
    /// on fetch errors for the seed page.
    fn extract_links(
        &self,
        seed_url: &str,
    ) -> impl Future<Output = Result<Vec<String>, AppError>> + Send;
}

/// Extracts the readable article from a single page.
pub trait ContentExtractor: Send + Sync + Clone {
    /// `Ok(None)` means "not an article, skip it". Errors are fetch-level
    /// failures only.
    fn extract_article(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<Option<Article>, AppError>> + Send;
}
