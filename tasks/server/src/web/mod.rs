use std::sync::Arc;

use axum::Router;
use migration::MigratorTrait;
use sea_orm::Database;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::task::TaskState;
use crate::task::api::v1::create_api_router;

/// OpenAPI documentation for the tasks API.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::task::api::v1::get_tasks_handler,
        crate::task::api::v1::get_task_handler,
        crate::task::api::v1::create_task_handler,
        crate::task::api::v1::update_task_handler,
        crate::task::api::v1::delete_task_handler,
    ),
    components(schemas(
        crate::task::api::v1::TaskJson,
        crate::task::api::v1::CreateTaskRequest,
        crate::task::api::v1::UpdateTaskRequest,
        crate::task::api::v1::ErrorResponse,
    )),
    tags(
        (name = "Tasks", description = "API for managing tasks")
    )
)]
pub struct ApiDoc;

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: Config) -> anyhow::Result<()> {
    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    let db = Database::connect(&config.db_url).await?;
    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    let task_state = Arc::new(TaskState { db: Arc::new(db) });

    // Create tasks router with database connection
    let tasks_router = create_api_router(task_state);

    let app = Router::new()
        .route("/health", axum::routing::get(health_check_handler))
        .merge(tasks_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::new()),
        );

    axum::serve(listener, app).await?;
    Ok(())
}

#[tracing::instrument]
pub async fn health_check_handler() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_check_returns_ok() {
        let app = Router::new().route("/health", axum::routing::get(health_check_handler));

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[test]
    fn openapi_document_lists_all_task_paths() {
        let doc = ApiDoc::openapi();
        let paths = doc.paths.paths;
        assert!(paths.contains_key("/tasks"));
        assert!(paths.contains_key("/tasks/{id}"));
    }
}
