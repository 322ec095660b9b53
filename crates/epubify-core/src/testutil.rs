//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::converter::{ConversionEvent, ConversionReporter};
use crate::error::AppError;
use crate::job::{Job, JobStatus};
use crate::models::Article;
use crate::registry::{MemoryRegistry, TaskRegistry};
use crate::traits::{ContentExtractor, LinkExtractor};

// ---------------------------------------------------------------------------
// MockLinkExtractor
// ---------------------------------------------------------------------------

/// Mock link extractor that returns a fixed list or an error.
#[derive(Clone)]
pub struct MockLinkExtractor {
    links: Vec<String>,
    error: Arc<Mutex<Option<AppError>>>,
    calls: Arc<Mutex<usize>>,
}

impl MockLinkExtractor {
    pub fn new(links: Vec<String>) -> Self {
        Self {
            links,
            error: Arc::new(Mutex::new(None)),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_error(error: AppError) -> Self {
        Self {
            links: Vec::new(),
            error: Arc::new(Mutex::new(Some(error))),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl LinkExtractor for MockLinkExtractor {
    async fn extract_links(&self, _seed_url: &str) -> Result<Vec<String>, AppError> {
        *self.calls.lock().unwrap() += 1;
        if let Some(e) = self.error.lock().unwrap().take() {
            return Err(e);
        }
        Ok(self.links.clone())
    }
}

// ---------------------------------------------------------------------------
// MockContentExtractor
// ---------------------------------------------------------------------------

/// What the mock content extractor does for one URL.
#[derive(Debug, Clone)]
pub enum PageOutcome {
    Article(Article),
    /// Not an article (`Ok(None)`).
    Skip,
    /// Fetch-level failure, surfaced as `AppError::HttpError`.
    Fail(String),
}

/// Mock content extractor with per-URL outcomes. Unknown URLs are skipped.
#[derive(Clone)]
pub struct MockContentExtractor {
    outcomes: Arc<Mutex<HashMap<String, PageOutcome>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockContentExtractor {
    /// Every URL in `urls` yields a small article titled after the URL.
    pub fn articles_for(urls: &[String]) -> Self {
        let outcomes = urls
            .iter()
            .map(|url| (url.clone(), PageOutcome::Article(sample_article(url))))
            .collect();
        Self {
            outcomes: Arc::new(Mutex::new(outcomes)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_outcome(self, url: &str, outcome: PageOutcome) -> Self {
        self.outcomes
            .lock()
            .unwrap()
            .insert(url.to_string(), outcome);
        self
    }

    /// URLs requested so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl ContentExtractor for MockContentExtractor {
    async fn extract_article(&self, url: &str) -> Result<Option<Article>, AppError> {
        self.calls.lock().unwrap().push(url.to_string());
        let outcome = self.outcomes.lock().unwrap().get(url).cloned();
        match outcome {
            Some(PageOutcome::Article(article)) => Ok(Some(article)),
            Some(PageOutcome::Fail(msg)) => Err(AppError::HttpError(msg)),
            Some(PageOutcome::Skip) | None => Ok(None),
        }
    }
}

pub fn sample_article(url: &str) -> Article {
    Article::new(
        format!("Page {url}"),
        "<p>This page explains one topic of the guide in enough words to pass the length check.</p>",
        url,
    )
}

// ---------------------------------------------------------------------------
// RecordingRegistry
// ---------------------------------------------------------------------------

/// Registry that stores jobs in a [`MemoryRegistry`] and records the
/// (status, progress, message) of every upsert, in order.
#[derive(Clone)]
pub struct RecordingRegistry {
    inner: MemoryRegistry,
    snapshots: Arc<Mutex<Vec<(JobStatus, u8, String)>>>,
}

impl RecordingRegistry {
    pub fn new() -> Self {
        Self {
            inner: MemoryRegistry::new(),
            snapshots: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn snapshots(&self) -> Vec<(JobStatus, u8, String)> {
        self.snapshots.lock().unwrap().clone()
    }
}

impl TaskRegistry for RecordingRegistry {
    async fn get(&self, id: Uuid) -> Result<Option<Job>, AppError> {
        self.inner.get(id).await
    }

    async fn upsert(&self, job: Job) -> Result<(), AppError> {
        self.snapshots
            .lock()
            .unwrap()
            .push((job.status, job.progress, job.message.clone()));
        self.inner.upsert(job).await
    }

    async fn remove(&self, id: Uuid) -> Result<bool, AppError> {
        self.inner.remove(id).await
    }

    async fn len(&self) -> Result<u64, AppError> {
        self.inner.len().await
    }
}

// ---------------------------------------------------------------------------
// RecordingReporter
// ---------------------------------------------------------------------------

/// Reporter that records a compact label per event.
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl ConversionReporter for RecordingReporter {
    fn report(&self, event: ConversionEvent<'_>) {
        let label = match event {
            ConversionEvent::Started { .. } => "started".to_string(),
            ConversionEvent::LinksDiscovered { count, .. } => format!("links:{count}"),
            ConversionEvent::PageStarted { index, .. } => format!("page:{index}"),
            ConversionEvent::PageExtracted { url, .. } => format!("extracted:{url}"),
            ConversionEvent::PageSkipped { url, .. } => format!("skipped:{url}"),
            ConversionEvent::Packaged { chapters, .. } => format!("packaged:{chapters}"),
            ConversionEvent::Completed { .. } => "completed".to_string(),
            ConversionEvent::Failed { .. } => "failed".to_string(),
        };
        self.events.lock().unwrap().push(label);
    }
}
