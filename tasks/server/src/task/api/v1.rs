use crate::task::{Task, TaskService, TaskServiceError, TaskState};
use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// JSON representation of a Task for API responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskJson {
    /// Unique identifier for the task
    id: Uuid,
    /// The title of the task
    title: String,
    /// The description of the task
    description: Option<String>,
    /// Indicates if the task is done
    done: bool,
    /// When the task was created
    created_at: DateTime<Utc>,
    /// When the task was last updated
    updated_at: DateTime<Utc>,
}

impl From<Task> for TaskJson {
    fn from(task: Task) -> Self {
        Self {
            id: task.id(),
            title: task.title().to_string(),
            description: task.description().map(str::to_string),
            done: task.done(),
            created_at: task.created_at(),
            updated_at: task.updated_at(),
        }
    }
}

/// JSON request payload for creating a task.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTaskRequest {
    /// The title of the task
    title: String,
    /// The description of the task
    #[serde(default)]
    description: Option<String>,
    /// Indicates if the task is done
    #[serde(default)]
    done: Option<bool>,
}

/// JSON request payload for updating a task. All fields are optional;
/// only the supplied ones change.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTaskRequest {
    /// A new title for the task
    #[serde(default)]
    title: Option<String>,
    /// A new description for the task
    #[serde(default)]
    description: Option<String>,
    /// A new done flag for the task
    #[serde(default)]
    done: Option<bool>,
}

/// JSON response for API errors.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message
    message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Custom error type for task handler operations.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents a request body that fails shape validation.
    #[error("{0}")]
    Validation(String),
    /// Represents a task that does not exist.
    #[error("Task does not exist")]
    NotFound,
    /// Represents an attempt to create a task that already exists.
    #[error("Task already exists")]
    Conflict,
    /// Represents any other task service error.
    #[error("Task service error: {0}")]
    Internal(#[from] TaskServiceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, message) = match self {
            ApiError::Validation(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Task does not exist".to_string()),
            ApiError::Conflict => (StatusCode::CONFLICT, "Task already exists".to_string()),
            ApiError::Internal(err) => {
                tracing::error!("Task service error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred while processing your request. Please try again later."
                        .to_string(),
                )
            }
        };
        (status_code, Json(ErrorResponse::new(message))).into_response()
    }
}

/// Handler for GET /tasks - Returns all tasks in JSON format.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/tasks",
    responses(
        (status = 200, description = "Returns an array of tasks", body = Vec<TaskJson>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn get_tasks_handler(
    State(state): State<Arc<TaskState>>,
) -> Result<Json<Vec<TaskJson>>, ApiError> {
    let service = TaskService::new(&state.db);
    let tasks = service.get_all_tasks().await.map_err(ApiError::Internal)?;
    Ok(Json(tasks.into_iter().map(TaskJson::from).collect()))
}

/// Handler for GET /tasks/{id} - Returns a single task by its ID.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/tasks/{id}",
    params(
        ("id" = String, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Returns the task", body = TaskJson),
        (status = 404, description = "Task does not exist", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn get_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<String>,
) -> Result<Json<TaskJson>, ApiError> {
    let service = TaskService::new(&state.db);
    let task = service
        .get_task_by_id(&id)
        .await
        .map_err(|err| match err {
            TaskServiceError::TaskNotFound(_) => ApiError::NotFound,
            other => ApiError::Internal(other),
        })?;
    Ok(Json(TaskJson::from(task)))
}

/// Handler for POST /tasks - Creates a new task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Returns the created task", body = TaskJson),
        (status = 400, description = "Request body failed validation", body = ErrorResponse),
        (status = 409, description = "Task already exists", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn create_task_handler(
    State(state): State<Arc<TaskState>>,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskJson>), ApiError> {
    // Shape validation happens before the store is touched.
    if payload.title.trim().is_empty() {
        return Err(ApiError::Validation("title must not be empty".to_string()));
    }

    let service = TaskService::new(&state.db);
    let task = service
        .create_task(&payload.title, payload.description, payload.done)
        .await
        .map_err(|err| match err {
            TaskServiceError::DuplicateTitle(_) => ApiError::Conflict,
            TaskServiceError::InvalidTitle => {
                ApiError::Validation("title must not be empty".to_string())
            }
            other => ApiError::Internal(other),
        })?;
    Ok((StatusCode::CREATED, Json(TaskJson::from(task))))
}

/// Handler for PUT /tasks/{id} - Partially updates a task by its ID.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    put,
    path = "/tasks/{id}",
    params(
        ("id" = String, Path, description = "Task ID")
    ),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Returns the updated task", body = TaskJson),
        (status = 400, description = "Request body failed validation", body = ErrorResponse),
        (status = 404, description = "Task does not exist", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn update_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<Json<TaskJson>, ApiError> {
    // Shape validation happens before the store is touched.
    if payload.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(ApiError::Validation("title must not be empty".to_string()));
    }

    let service = TaskService::new(&state.db);
    let task = service
        .update_task_by_id(&id, payload.title, payload.description, payload.done)
        .await
        .map_err(|err| match err {
            TaskServiceError::TaskNotFound(_) => ApiError::NotFound,
            TaskServiceError::InvalidTitle => {
                ApiError::Validation("title must not be empty".to_string())
            }
            other => ApiError::Internal(other),
        })?;
    Ok(Json(TaskJson::from(task)))
}

/// Handler for DELETE /tasks/{id} - Deletes a task by its ID.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/tasks/{id}",
    params(
        ("id" = String, Path, description = "Task ID")
    ),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 404, description = "Task does not exist", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn delete_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let service = TaskService::new(&state.db);
    service
        .delete_task_by_id(&id)
        .await
        .map_err(|err| match err {
            TaskServiceError::TaskNotFound(_) => ApiError::NotFound,
            other => ApiError::Internal(other),
        })?;
    Ok(StatusCode::NO_CONTENT)
}

/// Creates and returns the tasks API router.
pub fn create_api_router(state: Arc<TaskState>) -> Router {
    Router::new()
        .route("/tasks", get(get_tasks_handler).post(create_task_handler))
        .route(
            "/tasks/{id}",
            get(get_task_handler)
                .put(update_task_handler)
                .delete(delete_task_handler),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn response_message(response: Response) -> (StatusCode, String) {
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        (status, json["message"].as_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn not_found_error_maps_to_404_with_fixed_message() {
        let response = ApiError::NotFound.into_response();
        let (status, message) = response_message(response).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(message, "Task does not exist");
    }

    #[tokio::test]
    async fn conflict_error_maps_to_409_with_fixed_message() {
        let response = ApiError::Conflict.into_response();
        let (status, message) = response_message(response).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(message, "Task already exists");
    }

    #[tokio::test]
    async fn validation_error_maps_to_400_with_field_message() {
        let response = ApiError::Validation("title must not be empty".to_string()).into_response();
        let (status, message) = response_message(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "title must not be empty");
    }

    #[tokio::test]
    async fn internal_error_maps_to_500_without_echoing_details() {
        let response =
            ApiError::Internal(TaskServiceError::InvalidTitle).into_response();
        let (status, message) = response_message(response).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!message.contains("title"));
    }

    #[test]
    fn task_json_preserves_all_task_fields() {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let task = Task::new(
            id,
            "Write report".to_string(),
            Some("Quarterly numbers".to_string()),
            true,
            now,
            now,
        );

        let json = TaskJson::from(task);
        assert_eq!(json.id, id);
        assert_eq!(json.title, "Write report");
        assert_eq!(json.description.as_deref(), Some("Quarterly numbers"));
        assert!(json.done);
        assert_eq!(json.created_at, now);
        assert_eq!(json.updated_at, now);
    }
}
