use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use url::Url;
use uuid::Uuid;

use crate::config::ConversionConfig;
use crate::epub::EpubPackager;
use crate::error::AppError;
use crate::job::{ConversionRequest, Job, JobStatus};
use crate::models::Article;
use crate::registry::TaskRegistry;
use crate::traits::{ContentExtractor, LinkExtractor};

const LINKS_FOUND_PROGRESS: u8 = 20;
const PACKAGING_PROGRESS: u8 = 80;
const FINALIZING_PROGRESS: u8 = 90;

/// Events emitted during a conversion for monitoring/logging.
#[derive(Debug, Clone)]
pub enum ConversionEvent<'a> {
    Started {
        job_id: Uuid,
        url: &'a str,
    },
    LinksDiscovered {
        job_id: Uuid,
        count: usize,
    },
    PageStarted {
        job_id: Uuid,
        index: usize,
        total: usize,
        url: &'a str,
    },
    PageExtracted {
        job_id: Uuid,
        url: &'a str,
        title: &'a str,
    },
    PageSkipped {
        job_id: Uuid,
        url: &'a str,
        reason: &'a str,
    },
    Packaged {
        job_id: Uuid,
        chapters: usize,
        bytes: usize,
    },
    Completed {
        job_id: Uuid,
    },
    Failed {
        job_id: Uuid,
        error: &'a str,
    },
}

/// Trait for receiving conversion events (decoupled logging).
pub trait ConversionReporter: Send + Sync {
    fn report(&self, event: ConversionEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingConversionReporter;

impl ConversionReporter for TracingConversionReporter {
    fn report(&self, event: ConversionEvent<'_>) {
        match event {
            ConversionEvent::Started { job_id, url } => {
                tracing::info!(%job_id, %url, "Conversion started");
            }
            ConversionEvent::LinksDiscovered { job_id, count } => {
                tracing::info!(%job_id, %count, "Documentation links discovered");
            }
            ConversionEvent::PageStarted {
                job_id,
                index,
                total,
                url,
            } => {
                tracing::debug!(%job_id, page = index + 1, %total, %url, "Processing page");
            }
            ConversionEvent::PageExtracted { job_id, url, title } => {
                tracing::debug!(%job_id, %url, %title, "Article extracted");
            }
            ConversionEvent::PageSkipped {
                job_id,
                url,
                reason,
            } => {
                tracing::warn!(%job_id, %url, %reason, "Page skipped");
            }
            ConversionEvent::Packaged {
                job_id,
                chapters,
                bytes,
            } => {
                tracing::info!(%job_id, %chapters, %bytes, "EPUB built");
            }
            ConversionEvent::Completed { job_id } => {
                tracing::info!(%job_id, "Conversion completed");
            }
            ConversionEvent::Failed { job_id, error } => {
                tracing::warn!(%job_id, %error, "Conversion failed");
            }
        }
    }
}

/// Drives one job through link discovery, per-page extraction and
/// packaging, recording progress in the task registry as it goes.
///
/// Generic over the extractors and the registry so tests can run the whole
/// state machine without network access.
pub struct ConversionService<L, C, R>
where
    L: LinkExtractor,
    C: ContentExtractor,
    R: TaskRegistry,
{
    links: L,
    content: C,
    registry: R,
    packager: EpubPackager,
    config: ConversionConfig,
}

impl<L, C, R> ConversionService<L, C, R>
where
    L: LinkExtractor + 'static,
    C: ContentExtractor + 'static,
    R: TaskRegistry,
{
    pub fn new(links: L, content: C, registry: R, config: ConversionConfig) -> Self {
        Self {
            links,
            content,
            registry,
            packager: EpubPackager::new(),
            config,
        }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Record a new `pending` job and start converting it in the background.
    ///
    /// Returns as soon as the job is stored; progress is observable only
    /// through the registry.
    pub async fn submit(self: &Arc<Self>, request: ConversionRequest) -> Result<Job, AppError> {
        let job = self.create_job(request).await?;

        let service = Arc::clone(self);
        let job_id = job.id;
        tokio::spawn(async move {
            if let Err(e) = service.run(job_id, &TracingConversionReporter).await {
                tracing::error!(%job_id, error = %e, "Conversion task could not run");
            }
        });

        Ok(job)
    }

    /// Validate the request and store a `pending` job without starting it.
    pub async fn create_job(&self, request: ConversionRequest) -> Result<Job, AppError> {
        request.validate()?;
        let job = Job::new(&request);
        self.registry.upsert(job.clone()).await?;
        tracing::info!(job_id = %job.id, url = %job.url, "Conversion queued");
        Ok(job)
    }

    /// Run the conversion for a stored job to a terminal state.
    ///
    /// Every failure after the job is loaded is recorded on the job itself;
    /// the returned record is always `completed` or `failed`. Errors are
    /// returned only if the job cannot be loaded.
    pub async fn run<RP: ConversionReporter>(
        &self,
        job_id: Uuid,
        reporter: &RP,
    ) -> Result<Job, AppError> {
        let job = self
            .registry
            .get(job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job not found: {job_id}")))?;

        if job.status.is_terminal() {
            tracing::debug!(%job_id, status = %job.status, "Job already finished");
            return Ok(job);
        }

        let mut tracker = JobTracker::new(job, &self.registry);
        tracker
            .update(JobStatus::Processing, 0, "Starting conversion...")
            .await;
        reporter.report(ConversionEvent::Started {
            job_id,
            url: &tracker.job.url,
        });

        match self.convert(&mut tracker, reporter).await {
            Ok(()) => {
                tracker
                    .update(
                        JobStatus::Completed,
                        100,
                        "Conversion completed successfully!",
                    )
                    .await;
                reporter.report(ConversionEvent::Completed { job_id });
            }
            Err(e) => {
                let message = format!("Conversion failed: {e}");
                reporter.report(ConversionEvent::Failed {
                    job_id,
                    error: &message,
                });
                tracker.fail(message).await;
            }
        }

        Ok(tracker.job)
    }

    async fn convert<RP: ConversionReporter>(
        &self,
        tracker: &mut JobTracker<'_, R>,
        reporter: &RP,
    ) -> Result<(), AppError> {
        let job_id = tracker.job.id;
        let seed = tracker.job.url.trim().to_string();
        validate_seed_url(&seed)?;

        let mut links = self.links.extract_links(&seed).await?;
        if links.is_empty() {
            return Err(AppError::Generic(
                "No documentation links found".to_string(),
            ));
        }
        links.truncate(self.config.max_pages);
        let total = links.len();
        reporter.report(ConversionEvent::LinksDiscovered {
            job_id,
            count: total,
        });
        tracker
            .update(
                JobStatus::Processing,
                LINKS_FOUND_PROGRESS,
                format!("Found {total} pages to convert"),
            )
            .await;

        let chapters = self.extract_pages(tracker, reporter, &links).await;

        tracker
            .update(
                JobStatus::Processing,
                PACKAGING_PROGRESS,
                format!("Building EPUB from {} chapters...", chapters.len()),
            )
            .await;
        let title = tracker.job.book_title(&self.config.default_title).to_string();
        let epub = self.packager.build(&title, &chapters)?;
        reporter.report(ConversionEvent::Packaged {
            job_id,
            chapters: chapters.len(),
            bytes: epub.len(),
        });

        tracker.attach(epub);
        tracker
            .update(JobStatus::Processing, FINALIZING_PROGRESS, "Finalizing EPUB...")
            .await;

        Ok(())
    }

    /// Extract every page in order, one at a time. Pages that fail or carry
    /// no article are skipped.
    async fn extract_pages<RP: ConversionReporter>(
        &self,
        tracker: &mut JobTracker<'_, R>,
        reporter: &RP,
        links: &[String],
    ) -> Vec<Article> {
        let job_id = tracker.job.id;
        let total = links.len();
        let span = usize::from(PACKAGING_PROGRESS - LINKS_FOUND_PROGRESS);
        let mut chapters = Vec::with_capacity(total);

        for (index, url) in links.iter().enumerate() {
            let progress = LINKS_FOUND_PROGRESS + (index * span / total) as u8;
            tracker
                .update(
                    JobStatus::Processing,
                    progress,
                    format!("Processing page {}/{}...", index + 1, total),
                )
                .await;
            reporter.report(ConversionEvent::PageStarted {
                job_id,
                index,
                total,
                url,
            });

            match self.content.extract_article(url).await {
                Ok(Some(article)) => {
                    reporter.report(ConversionEvent::PageExtracted {
                        job_id,
                        url,
                        title: &article.title,
                    });
                    chapters.push(article);
                }
                Ok(None) => {
                    reporter.report(ConversionEvent::PageSkipped {
                        job_id,
                        url,
                        reason: "no readable article content",
                    });
                }
                Err(e) => {
                    let reason = e.to_string();
                    reporter.report(ConversionEvent::PageSkipped {
                        job_id,
                        url,
                        reason: &reason,
                    });
                }
            }
        }

        chapters
    }
}

/// The seed must be an absolute http(s) URL with a host.
pub fn validate_seed_url(raw: &str) -> Result<Url, AppError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| AppError::InvalidInput(format!("Invalid URL provided: {e}")))?;
    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(AppError::InvalidInput(format!(
                "Invalid URL provided: scheme '{scheme}' is not supported"
            )));
        }
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(AppError::InvalidInput(
            "Invalid URL provided: missing host".to_string(),
        ));
    }
    Ok(url)
}

/// Owns the job record for the duration of one conversion and writes every
/// change through to the registry.
struct JobTracker<'r, R: TaskRegistry> {
    job: Job,
    registry: &'r R,
}

impl<'r, R: TaskRegistry> JobTracker<'r, R> {
    fn new(job: Job, registry: &'r R) -> Self {
        Self { job, registry }
    }

    /// Progress never moves backwards, whatever the caller passes.
    async fn update(&mut self, status: JobStatus, progress: u8, message: impl Into<String>) {
        self.job.status = status;
        self.job.progress = self.job.progress.max(progress.min(100));
        self.job.message = message.into();
        self.persist().await;
    }

    /// Mark failed, keeping the progress reached so far.
    async fn fail(&mut self, message: String) {
        self.job.status = JobStatus::Failed;
        self.job.message = message;
        self.persist().await;
    }

    fn attach(&mut self, epub: Vec<u8>) {
        self.job.epub = Some(Bytes::from(epub));
        self.job.download_url = Some(format!("/download/{}", self.job.id));
    }

    async fn persist(&mut self) {
        self.job.updated_at = Utc::now();
        tracing::debug!(
            job_id = %self.job.id,
            status = %self.job.status,
            progress = self.job.progress,
            message = %self.job.message,
            "Job updated"
        );
        if let Err(e) = self.registry.upsert(self.job.clone()).await {
            tracing::error!(job_id = %self.job.id, error = %e, "Failed to update job record");
        }
    }
}
