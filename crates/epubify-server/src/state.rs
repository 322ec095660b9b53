use std::sync::Arc;

use epubify_client::{DocLinkExtractor, ReadabilityExtractor, ReqwestFetcher};
use epubify_core::config::ConversionConfig;
use epubify_core::converter::ConversionService;
use epubify_core::error::AppError;
use epubify_core::registry::MemoryRegistry;

/// The conversion pipeline wired with the HTTP-backed extractors.
pub type Converter = ConversionService<
    DocLinkExtractor<ReqwestFetcher>,
    ReadabilityExtractor<ReqwestFetcher>,
    MemoryRegistry,
>;

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub converter: Arc<Converter>,
}

impl AppState {
    pub fn new(config: ConversionConfig, registry: MemoryRegistry) -> Result<Self, AppError> {
        let fetcher = ReqwestFetcher::from_config(&config)?;
        let links = DocLinkExtractor::with_config(fetcher.clone(), &config);
        let content = ReadabilityExtractor::with_config(fetcher, &config);

        Ok(Self {
            converter: Arc::new(ConversionService::new(links, content, registry, config)),
        })
    }
}
