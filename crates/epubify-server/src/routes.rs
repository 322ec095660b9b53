use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use chrono::Utc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use epubify_core::epub::EPUB_MIME_TYPE;
use epubify_core::error::AppError;
use epubify_core::job::{ConversionRequest, Job, epub_filename};
use epubify_core::registry::TaskRegistry;

use crate::dto::{
    ConvertRequest, ConvertResponse, HealthResponse, MessageResponse, RootResponse,
    StatusResponse,
};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Build the full router with all routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/convert", post(convert))
        .route("/status/{task_id}", get(status))
        .route("/download/{task_id}", get(download))
        .route("/task/{task_id}", delete(delete_task))
        .route("/health", get(health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
}

/// Look up a job; malformed ids are reported the same way as unknown ones.
async fn find_job(state: &AppState, task_id: &str) -> Result<Job, ApiError> {
    let not_found = || ApiError(AppError::NotFound(format!("Task not found: {task_id}")));
    let id = Uuid::parse_str(task_id).map_err(|_| not_found())?;
    state
        .converter
        .registry()
        .get(id)
        .await?
        .ok_or_else(not_found)
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/convert",
    request_body = ConvertRequest,
    responses(
        (status = 202, description = "Conversion started", body = ConvertResponse),
        (status = 400, description = "Missing or blank URL", body = crate::dto::ErrorResponse),
    ),
    tag = "conversion"
)]
pub async fn convert(
    State(state): State<Arc<AppState>>,
    axum::Json(body): axum::Json<ConvertRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let url = body
        .url
        .ok_or_else(|| AppError::InvalidInput("url is required".to_string()))?;
    let request = match body.title {
        Some(title) => ConversionRequest::new(url).with_title(title),
        None => ConversionRequest::new(url),
    };

    let job = state.converter.submit(request).await?;

    let response = ConvertResponse {
        task_id: job.id,
        message: "Conversion started".to_string(),
    };
    Ok((StatusCode::ACCEPTED, axum::Json(response)))
}

#[utoipa::path(
    get,
    path = "/status/{task_id}",
    params(
        ("task_id" = String, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task status", body = StatusResponse),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
    ),
    tag = "conversion"
)]
pub async fn status(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let job = find_job(&state, &task_id).await?;
    Ok(axum::Json(StatusResponse::from(job)))
}

#[utoipa::path(
    get,
    path = "/download/{task_id}",
    params(
        ("task_id" = String, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "EPUB file", content_type = "application/epub+zip"),
        (status = 400, description = "Conversion not finished", body = crate::dto::ErrorResponse),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
    ),
    tag = "conversion"
)]
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let job = find_job(&state, &task_id).await?;
    let epub = job.download()?;

    let title = job.book_title(&state.converter.config().default_title);
    let disposition = format!("attachment; filename=\"{}\"", epub_filename(title));

    Ok((
        [
            (header::CONTENT_TYPE, EPUB_MIME_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        epub,
    ))
}

#[utoipa::path(
    delete,
    path = "/task/{task_id}",
    params(
        ("task_id" = String, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task deleted", body = MessageResponse),
        (status = 400, description = "Conversion still running", body = crate::dto::ErrorResponse),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
    ),
    tag = "conversion"
)]
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let job = find_job(&state, &task_id).await?;

    // A running conversion writes its record back on every update.
    if !job.status.is_terminal() {
        return Err(AppError::NotReady(format!(
            "Task is still {}; delete it once the conversion finishes",
            job.status
        ))
        .into());
    }

    if !state.converter.registry().remove(job.id).await? {
        return Err(AppError::NotFound(format!("Task not found: {task_id}")).into());
    }
    tracing::info!(job_id = %job.id, "Task deleted");

    Ok(axum::Json(MessageResponse {
        message: "Task deleted successfully".to_string(),
    }))
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service banner", body = RootResponse),
    ),
    tag = "system"
)]
pub async fn root() -> impl IntoResponse {
    axum::Json(RootResponse {
        message: "Epubify API",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let tasks = state.converter.registry().len().await?;

    Ok(axum::Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        tasks,
    }))
}
