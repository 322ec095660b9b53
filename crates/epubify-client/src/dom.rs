use epubify_core::util::collapse_whitespace;
use scraper::{ElementRef, Html, Selector};

/// A parsed HTML page with CSS-selector lookups.
///
/// Invalid selectors match nothing.
pub struct Page {
    html: Html,
}

impl Page {
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    pub fn select_first(&self, css: &str) -> Option<ElementRef<'_>> {
        let selector = Selector::parse(css).ok()?;
        self.html.select(&selector).next()
    }

    pub fn select_all(&self, css: &str) -> Vec<ElementRef<'_>> {
        match Selector::parse(css) {
            Ok(selector) => self.html.select(&selector).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// First non-blank value of attribute `name` among elements matching `css`,
    /// whitespace collapsed.
    pub fn attr(&self, css: &str, name: &str) -> Option<String> {
        self.select_all(css)
            .into_iter()
            .filter_map(|el| el.value().attr(name))
            .map(collapse_whitespace)
            .find(|value| !value.is_empty())
    }

    /// First non-blank text among elements matching `css`, whitespace collapsed.
    pub fn text(&self, css: &str) -> Option<String> {
        self.select_all(css)
            .into_iter()
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .find(|text| !text.is_empty())
    }
}
