use std::sync::Arc;

use crate::{
    auth::{self, AuthState},
    task::{self, TaskState},
    user::{self, UserState},
};

use axum::{
    Json, Router,
    extract::rejection::JsonRejection,
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};

/// JSON response for API errors
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Machine readable error code
    pub error: String,
    /// Human readable description, safe to display
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            message: message.into(),
        }
    }
}

/// JSON response carrying a confirmation message.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error type returned by JSON API handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Bad input shape or values.
    #[error("{0}")]
    Validation(String),
    /// Resource missing or not owned by the caller.
    #[error("{0}")]
    NotFound(String),
    /// Missing, invalid or expired credentials.
    #[error("{0}")]
    Unauthorized(String),
    /// Anything the caller cannot correct.
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("VALIDATION_ERROR", message),
            ),
            ApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new("NOT_FOUND", message),
            ),
            ApiError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("UNAUTHORIZED", message),
            ),
            ApiError::Internal(err) => {
                tracing::error!("Request failed: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(
                        "INTERNAL_ERROR",
                        "An unexpected error occurred while processing your request. Please try again later.",
                    ),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<task::TaskServiceError> for ApiError {
    fn from(err: task::TaskServiceError) -> Self {
        match err {
            task::TaskServiceError::Validation(message) => ApiError::Validation(message),
            task::TaskServiceError::NotFound => ApiError::NotFound(err.to_string()),
            task::TaskServiceError::OwnerMissing => ApiError::Unauthorized(err.to_string()),
            task::TaskServiceError::Database(db_err) => ApiError::Internal(db_err.into()),
        }
    }
}

impl From<user::UserServiceError> for ApiError {
    fn from(err: user::UserServiceError) -> Self {
        match err {
            user::UserServiceError::Validation(message) => ApiError::Validation(message),
            user::UserServiceError::AlreadyExists => ApiError::Validation(err.to_string()),
            user::UserServiceError::InvalidCredentials => ApiError::Unauthorized(err.to_string()),
            user::UserServiceError::NotFound => ApiError::NotFound(err.to_string()),
            user::UserServiceError::Database(db_err) => ApiError::Internal(db_err.into()),
            user::UserServiceError::PasswordHash(hash_err) => {
                ApiError::Internal(hash_err.into())
            }
        }
    }
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI document for the JSON API.
#[derive(OpenApi)]
#[openapi(
    paths(
        task::api::v1::create_task_handler,
        task::api::v1::list_tasks_handler,
        task::api::v1::task_stats_handler,
        task::api::v1::get_task_handler,
        task::api::v1::update_task_handler,
        task::api::v1::delete_task_handler,
        user::api::v1::register_handler,
        user::api::v1::login_handler,
        user::api::v1::current_user_handler,
        user::api::v1::delete_current_user_handler,
        crate::web::health_check_handler,
    ),
    components(schemas(
        task::api::v1::TaskJson,
        task::NewTask,
        task::TaskPatch,
        task::TaskStats,
        task::TaskStatus,
        user::api::v1::RegisterRequest,
        user::api::v1::LoginRequest,
        user::api::v1::AuthResponse,
        user::api::v1::UserJson,
        crate::web::HealthResponse,
        ErrorResponse,
        MessageResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Tasks", description = "Ownership-scoped task management"),
        (name = "Auth", description = "Registration and login"),
        (name = "Health", description = "Service health")
    )
)]
pub struct ApiDoc;

/// Creates the API routes for JSON API endpoints, nested under `/api`.
pub fn create_api_router(
    auth_state: Arc<AuthState>,
    user_state: Arc<UserState>,
    task_state: Arc<TaskState>,
) -> Router {
    let public_routes = user::api::v1::create_public_router(user_state.clone());
    let protected_routes = task::api::v1::create_api_router(task_state)
        .merge(user::api::v1::create_protected_router(user_state))
        .layer(ServiceBuilder::new().layer(from_fn(auth::api::v1::require_auth_middleware)));
    let api_routes = public_routes.merge(protected_routes);
    Router::new()
        .nest("/api", api_routes)
        .layer(ServiceBuilder::new().layer(from_fn_with_state(
            auth_state,
            auth::api::v1::auth_user_middleware,
        )))
}
