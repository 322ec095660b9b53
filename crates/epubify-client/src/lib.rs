pub mod article;
pub mod dom;
pub mod fetcher;
pub mod links;
pub mod readability;

pub use article::{ReadabilityExtractor, parse_article};
pub use dom::Page;
pub use fetcher::ReqwestFetcher;
pub use links::{DocLinkExtractor, LinkPolicy, collect_links};
