use thiserror::Error;

/// Application-wide error types for Epubify.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or malformed input (seed URL, request body).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP request failed or returned a non-success status.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// No readable article could be extracted from a page.
    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    /// Assembling the EPUB archive failed.
    #[error("Packaging error: {0}")]
    PackagingError(String),

    /// Unknown job identifier.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The job exists but has no downloadable result yet.
    #[error("{0}")]
    NotReady(String),

    /// Task registry operation failed.
    #[error("Registry error: {0}")]
    RegistryError(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true for the fetch family: transport failures, timeouts and
    /// non-success HTTP statuses.
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            AppError::HttpError(_) | AppError::NetworkError(_) | AppError::Timeout(_)
        )
    }

    /// Returns true if the error was caused by the caller's input rather than
    /// by the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::InvalidInput(_) | AppError::NotFound(_) | AppError::NotReady(_)
        )
    }
}

impl From<zip::result::ZipError> for AppError {
    fn from(err: zip::result::ZipError) -> Self {
        AppError::PackagingError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::PackagingError(err.to_string())
    }
}
