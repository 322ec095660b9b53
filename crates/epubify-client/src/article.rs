use epubify_core::config::{ConversionConfig, DEFAULT_MIN_CONTENT_LENGTH};
use epubify_core::error::AppError;
use epubify_core::models::Article;
use epubify_core::traits::{ContentExtractor, Fetcher};
use epubify_core::util::truncate_chars;
use url::Url;

use crate::dom::Page;
use crate::readability;

pub const UNTITLED: &str = "Untitled Page";
pub const EXCERPT_CHARS: usize = 200;

const SITE_SEPARATORS: &[&str] = &[" | ", " - ", " — ", " – "];

/// Turn one HTML page into an [`Article`].
///
/// Fails with `ExtractionFailed` when no readable content is found or the
/// cleaned content is shorter than `min_content_length` characters.
pub fn parse_article(html: &str, url: &str, min_content_length: usize) -> Result<Article, AppError> {
    let base = Url::parse(url).map_err(|e| AppError::InvalidInput(format!("Invalid URL {url}: {e}")))?;
    let page = Page::parse(html);

    let readable = readability::extract(page.html(), &base)
        .ok_or_else(|| AppError::ExtractionFailed("no readable content".into()))?;

    let length = readable.content.chars().count();
    if length < min_content_length {
        return Err(AppError::ExtractionFailed(format!(
            "content too short ({length} < {min_content_length} chars)"
        )));
    }

    let excerpt = page
        .attr("meta[name='description']", "content")
        .or(readable.first_paragraph)
        .map(|text| truncate_chars(&text, EXCERPT_CHARS))
        .unwrap_or_default();

    Ok(Article::new(page_title(&page), readable.content, url).with_excerpt(excerpt))
}

/// `og:title`, else `<title>` without its site suffix, else the raw
/// `<title>`, else the first heading, else [`UNTITLED`].
fn page_title(page: &Page) -> String {
    let raw_title = page.text("title");

    page.attr("meta[property='og:title']", "content")
        .or_else(|| raw_title.as_deref().and_then(strip_site_suffix))
        .or(raw_title)
        .or_else(|| page.text("h1, h2, h3"))
        .unwrap_or_else(|| UNTITLED.to_string())
}

fn strip_site_suffix(title: &str) -> Option<String> {
    let cut = SITE_SEPARATORS
        .iter()
        .filter_map(|sep| title.rfind(sep))
        .max()
        .unwrap_or(title.len());
    let stripped = title[..cut].trim();
    (!stripped.is_empty()).then(|| stripped.to_string())
}

/// Content extractor that fetches a page and runs readability over it.
///
/// Pages that are feeds, have no readable content, or are too short are
/// skipped (`Ok(None)`) with a warning. Fetch errors are returned.
#[derive(Clone)]
pub struct ReadabilityExtractor<F> {
    fetcher: F,
    min_content_length: usize,
}

impl<F: Fetcher> ReadabilityExtractor<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            min_content_length: DEFAULT_MIN_CONTENT_LENGTH,
        }
    }

    pub fn with_config(fetcher: F, config: &ConversionConfig) -> Self {
        Self {
            fetcher,
            min_content_length: config.min_content_length,
        }
    }
}

impl<F: Fetcher> ContentExtractor for ReadabilityExtractor<F> {
    async fn extract_article(&self, url: &str) -> Result<Option<Article>, AppError> {
        let page = self.fetcher.fetch(url).await?;

        if page.is_feed() {
            tracing::warn!(
                %url,
                content_type = page.content_type.as_deref().unwrap_or_default(),
                "Skipping feed document"
            );
            return Ok(None);
        }

        match parse_article(&page.body, &page.final_url, self.min_content_length) {
            Ok(mut article) => {
                article.url = url.to_string();
                tracing::debug!(%url, title = %article.title, chars = article.content.len(), "Extracted article");
                Ok(Some(article))
            }
            Err(e) => {
                tracing::warn!(%url, error = %e, "Skipping page");
                Ok(None)
            }
        }
    }
}
