use crate::auth::CurrentUser;
use crate::task::{NewTask, Task, TaskPatch, TaskService, TaskState, TaskStats, TaskStatus};
use crate::web::api::{ApiError, ErrorResponse, MessageResponse};
use axum::{
    Extension, Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// JSON representation of a Task for API responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskJson {
    /// Unique identifier for the task
    id: Uuid,
    /// Task title
    title: String,
    /// Current status
    status: TaskStatus,
    /// ID of the owning user
    user_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<Task> for TaskJson {
    fn from(task: Task) -> Self {
        Self {
            id: task.id(),
            title: task.title().to_string(),
            status: task.status(),
            user_id: task.user_id(),
            created_at: task.created_at(),
            updated_at: task.updated_at(),
        }
    }
}

/// Task IDs that do not parse are treated like IDs that do not exist.
fn parse_task_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound("Task not found".to_string()))
}

/// Handler for POST /api/tasks - Creates a task owned by the caller.
#[tracing::instrument(skip(state, user, payload), fields(user_id = %user.id))]
#[utoipa::path(
    post,
    path = "/api/tasks",
    request_body = NewTask,
    responses(
        (status = 201, description = "Task created", body = TaskJson),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Missing or invalid credentials", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn create_task_handler(
    State(state): State<Arc<TaskState>>,
    Extension(user): Extension<CurrentUser>,
    payload: Result<Json<NewTask>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskJson>), ApiError> {
    let Json(new_task) = payload?;
    let service = TaskService::new(&state.db);
    let task = service.create_task(user.id, new_task).await?;
    Ok((StatusCode::CREATED, Json(TaskJson::from(task))))
}

/// Handler for GET /api/tasks - Returns the caller's tasks, newest first.
#[tracing::instrument(skip(state, user), fields(user_id = %user.id))]
#[utoipa::path(
    get,
    path = "/api/tasks",
    responses(
        (status = 200, description = "Tasks owned by the caller", body = [TaskJson]),
        (status = 401, description = "Missing or invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn list_tasks_handler(
    State(state): State<Arc<TaskState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<TaskJson>>, ApiError> {
    let service = TaskService::new(&state.db);
    let tasks = service.list_tasks(user.id).await?;
    Ok(Json(tasks.into_iter().map(TaskJson::from).collect()))
}

/// Handler for GET /api/tasks/stats - Returns task counts per status.
#[tracing::instrument(skip(state, user), fields(user_id = %user.id))]
#[utoipa::path(
    get,
    path = "/api/tasks/stats",
    responses(
        (status = 200, description = "Task counts per status", body = TaskStats),
        (status = 401, description = "Missing or invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn task_stats_handler(
    State(state): State<Arc<TaskState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<TaskStats>, ApiError> {
    let service = TaskService::new(&state.db);
    let stats = service.task_stats(user.id).await?;
    Ok(Json(stats))
}

/// Handler for GET /api/tasks/{id} - Returns one of the caller's tasks.
#[tracing::instrument(skip(state, user), fields(user_id = %user.id))]
#[utoipa::path(
    get,
    path = "/api/tasks/{id}",
    params(("id" = String, Path, description = "Task ID")),
    responses(
        (status = 200, description = "The task", body = TaskJson),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn get_task_handler(
    State(state): State<Arc<TaskState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<TaskJson>, ApiError> {
    let id = parse_task_id(&id)?;
    let service = TaskService::new(&state.db);
    let task = service.get_task(id, user.id).await?;
    Ok(Json(TaskJson::from(task)))
}

/// Handler for PUT /api/tasks/{id} - Updates the title and/or status of a task.
#[tracing::instrument(skip(state, user, payload), fields(user_id = %user.id))]
#[utoipa::path(
    put,
    path = "/api/tasks/{id}",
    params(("id" = String, Path, description = "Task ID")),
    request_body = TaskPatch,
    responses(
        (status = 200, description = "Task updated", body = TaskJson),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn update_task_handler(
    State(state): State<Arc<TaskState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    payload: Result<Json<TaskPatch>, JsonRejection>,
) -> Result<Json<TaskJson>, ApiError> {
    let id = parse_task_id(&id)?;
    let Json(patch) = payload?;
    let service = TaskService::new(&state.db);
    let task = service.update_task(id, user.id, patch).await?;
    Ok(Json(TaskJson::from(task)))
}

/// Handler for DELETE /api/tasks/{id} - Permanently deletes a task.
#[tracing::instrument(skip(state, user), fields(user_id = %user.id))]
#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    params(("id" = String, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task deleted", body = MessageResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn delete_task_handler(
    State(state): State<Arc<TaskState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_task_id(&id)?;
    let service = TaskService::new(&state.db);
    service.delete_task(id, user.id).await?;
    Ok(Json(MessageResponse::new("Task deleted successfully")))
}

/// Creates and returns the tasks API router.
pub fn create_api_router(state: Arc<TaskState>) -> Router {
    Router::new()
        .route("/tasks", get(list_tasks_handler).post(create_task_handler))
        .route("/tasks/stats", get(task_stats_handler))
        .route(
            "/tasks/{id}",
            get(get_task_handler)
                .put(update_task_handler)
                .delete(delete_task_handler),
        )
        .with_state(state)
}
