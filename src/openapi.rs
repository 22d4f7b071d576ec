use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::features::health::handler::health_check,
        crate::features::removal::handler::remove_bg,
    ),
    components(schemas(
        crate::error::StatusResponse,
        crate::features::health::HealthResponse,
        crate::features::removal::RemoveBgUpload,
    )),
    tags(
        (name = "Health", description = "Health APIs"),
        (name = "Removal", description = "Background removal APIs"),
    ),
    info(
        title = "Background Removal Service API",
        version = "0.1.0",
        description = "Image background removal service (Axum)"
    )
)]
pub struct ApiDoc;
