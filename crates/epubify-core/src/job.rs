use std::fmt;
use std::str::FromStr;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Status of a conversion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(format!("Unknown job status: {}", s)),
        }
    }
}

/// One URL-to-EPUB conversion and its tracked lifecycle state.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: Uuid,
    pub url: String,
    pub title: Option<String>,
    pub status: JobStatus,
    /// Percentage, 0..=100.
    pub progress: u8,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// The finished EPUB, attached once packaging succeeds.
    #[serde(skip)]
    pub epub: Option<Bytes>,
    pub download_url: Option<String>,
}

impl Job {
    /// Create a `pending` job for the given request.
    pub fn new(request: &ConversionRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            url: request.url.clone(),
            title: request.title.clone(),
            status: JobStatus::Pending,
            progress: 0,
            message: "Conversion queued".to_string(),
            created_at: now,
            updated_at: now,
            epub: None,
            download_url: None,
        }
    }

    /// The book title: the requested one, or `default_title` when none was given.
    pub fn book_title<'a>(&'a self, default_title: &'a str) -> &'a str {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(default_title)
    }

    /// Returns the EPUB bytes if the job completed with an attached binary.
    pub fn download(&self) -> Result<Bytes, AppError> {
        if self.status != JobStatus::Completed {
            return Err(AppError::NotReady(
                "Conversion not completed yet".to_string(),
            ));
        }
        self.epub
            .clone()
            .ok_or_else(|| AppError::NotReady("EPUB file not available".to_string()))
    }
}

/// Request to create a new conversion job.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub url: String,
    pub title: Option<String>,
}

impl ConversionRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Submit-time check: the URL must be present. Well-formedness is
    /// checked later by the orchestrator, which records it on the job.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.url.trim().is_empty() {
            return Err(AppError::InvalidInput("url is required".to_string()));
        }
        Ok(())
    }
}

/// Turn a book title into a safe download file name.
///
/// Every character that is not ASCII alphanumeric becomes `_`.
/// Example: `"AWS Lambda: Guide"` → `"AWS_Lambda__Guide.epub"`
pub fn epub_filename(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "documentation.epub".to_string()
    } else {
        format!("{stem}.epub")
    }
}
