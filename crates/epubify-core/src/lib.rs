pub mod config;
pub mod converter;
pub mod epub;
pub mod error;
pub mod job;
pub mod models;
pub mod registry;
pub mod traits;
pub mod util;

#[cfg(test)]
mod testutil;

pub use config::ConversionConfig;
pub use converter::{
    ConversionEvent, ConversionReporter, ConversionService, TracingConversionReporter,
};
pub use epub::EpubPackager;
pub use error::AppError;
pub use job::{ConversionRequest, Job, JobStatus, epub_filename};
pub use models::{Article, FetchedPage};
pub use registry::{MemoryRegistry, TaskRegistry};
pub use traits::{ContentExtractor, Fetcher, LinkExtractor};
