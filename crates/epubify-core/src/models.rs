/// A page downloaded by a [`Fetcher`](crate::traits::Fetcher).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// The URL that was requested.
    pub url: String,
    /// The URL after redirects.
    pub final_url: String,
    /// Raw `Content-Type` header value, if the server sent one.
    pub content_type: Option<String>,
    pub body: String,
}

impl FetchedPage {
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            final_url: url.clone(),
            url,
            content_type: Some("text/html; charset=utf-8".to_string()),
            body: body.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: Option<&str>) -> Self {
        self.content_type = content_type.map(str::to_string);
        self
    }

    /// True when the response declares an HTML media type, or declares none.
    pub fn is_html(&self) -> bool {
        match self.media_type() {
            None => true,
            Some(mt) => mt == "text/html" || mt == "application/xhtml+xml",
        }
    }

    /// True when the response is an XML, RSS or Atom document rather than HTML.
    pub fn is_feed(&self) -> bool {
        match self.media_type() {
            None => false,
            Some(mt) => {
                (mt.contains("xml") && !mt.contains("xhtml"))
                    || mt.contains("rss")
                    || mt.contains("atom")
            }
        }
    }

    fn media_type(&self) -> Option<String> {
        self.content_type.as_deref().map(|ct| {
            ct.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }
}

/// The readable content of one documentation page, destined to become one
/// EPUB chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    /// Never empty; see the title fallback chain in the content extractor.
    pub title: String,
    /// Sanitized, well-formed XHTML fragment.
    pub content: String,
    pub url: String,
    pub excerpt: String,
}

impl Article {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            url: url.into(),
            excerpt: String::new(),
        }
    }

    pub fn with_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.excerpt = excerpt.into();
        self
    }
}
