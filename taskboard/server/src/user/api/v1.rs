use crate::auth::CurrentUser;
use crate::user::{User, UserService, UserServiceError, UserState};
use crate::web::api::{ApiError, ErrorResponse, MessageResponse};
use axum::{
    Extension, Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// JSON request payload for registration
#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// JSON request payload for login
#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public profile of a user.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserJson {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserJson {
    fn from(user: User) -> Self {
        Self {
            id: user.id(),
            name: user.name().to_string(),
            email: user.email().to_string(),
            created_at: user.created_at(),
        }
    }
}

/// JSON response for successful registration or login
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserJson,
}

async fn auth_response(state: &UserState, user: User) -> Result<AuthResponse, ApiError> {
    let token = state
        .auth
        .issue_token(user.id(), user.email())
        .await
        .map_err(|err| ApiError::Internal(err.into()))?;
    Ok(AuthResponse {
        token,
        user: UserJson::from(user),
    })
}

/// A valid token whose account has since been deleted is a stale credential.
fn account_gone_is_unauthorized(err: UserServiceError) -> ApiError {
    match err {
        UserServiceError::NotFound => {
            ApiError::Unauthorized("Account no longer exists".to_string())
        }
        other => ApiError::from(other),
    }
}

/// Handler for POST /api/auth/register - Creates an account and returns a token.
#[tracing::instrument(skip(state, payload))]
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Validation error or email already registered", body = ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn register_handler(
    State(state): State<Arc<UserState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let Json(request) = payload?;
    let service = UserService::new(&state.db, state.password_hash_iterations);
    let user = service
        .register(&request.name, &request.email, &request.password)
        .await?;
    let response = auth_response(&state, user).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Handler for POST /api/auth/login - Exchanges credentials for a token.
#[tracing::instrument(skip(state, payload))]
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn login_handler(
    State(state): State<Arc<UserState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(request) = payload?;
    let service = UserService::new(&state.db, state.password_hash_iterations);
    let user = service
        .authenticate(&request.email, &request.password)
        .await?;
    Ok(Json(auth_response(&state, user).await?))
}

/// Handler for GET /api/auth/me - Returns the caller's profile.
#[tracing::instrument(skip(state, user), fields(user_id = %user.id))]
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserJson),
        (status = 401, description = "Missing or invalid credentials", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn current_user_handler(
    State(state): State<Arc<UserState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<UserJson>, ApiError> {
    let service = UserService::new(&state.db, state.password_hash_iterations);
    let profile = service
        .get_user(user.id)
        .await
        .map_err(account_gone_is_unauthorized)?;
    Ok(Json(UserJson::from(profile)))
}

/// Handler for DELETE /api/auth/me - Deletes the caller's account and all of their tasks.
#[tracing::instrument(skip(state, user), fields(user_id = %user.id))]
#[utoipa::path(
    delete,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Account deleted", body = MessageResponse),
        (status = 401, description = "Missing, invalid or stale credentials", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn delete_current_user_handler(
    State(state): State<Arc<UserState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<MessageResponse>, ApiError> {
    let service = UserService::new(&state.db, state.password_hash_iterations);
    service
        .delete_user(user.id)
        .await
        .map_err(account_gone_is_unauthorized)?;
    Ok(Json(MessageResponse::new("Account deleted successfully")))
}

/// Routes that do not require authentication.
pub fn create_public_router(state: Arc<UserState>) -> Router {
    Router::new()
        .route("/auth/register", post(register_handler))
        .route("/auth/login", post(login_handler))
        .with_state(state)
}

/// Routes that require an authenticated user.
pub fn create_protected_router(state: Arc<UserState>) -> Router {
    Router::new()
        .route(
            "/auth/me",
            get(current_user_handler).delete(delete_current_user_handler),
        )
        .with_state(state)
}
