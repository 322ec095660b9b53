use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Epubify API",
        version = "0.1.0",
        description = "Converts documentation websites into EPUB books."
    ),
    paths(
        crate::routes::root,
        crate::routes::convert,
        crate::routes::status,
        crate::routes::download,
        crate::routes::delete_task,
        crate::routes::health,
    ),
    components(schemas(
        crate::dto::ConvertRequest,
        crate::dto::ConvertResponse,
        crate::dto::StatusResponse,
        crate::dto::RootResponse,
        crate::dto::MessageResponse,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "conversion", description = "Conversion jobs and downloads"),
        (name = "system", description = "Health and service information"),
    )
)]
pub struct ApiDoc;
