use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderValue, Method, StatusCode, header};
use chrono::{DateTime, Utc};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveRequestHeadersLayer;
use tower_http::trace::TraceLayer;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::AuthState;
use crate::config::{self, Config};
use crate::task::TaskState;
use crate::user::UserState;

pub mod api;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<DatabaseConnection>,
}

/// Health report for the service and its database.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub timestamp: DateTime<Utc>,
    pub environment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: config::Config) -> anyhow::Result<()> {
    let server_address = format!("0.0.0.0:{}", &config.port);

    let db = Database::connect(&config.database_url).await?;
    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    let app = create_app(config, db);

    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Builds the full application router around an already migrated database.
pub fn create_app(config: Config, db: DatabaseConnection) -> Router {
    let state = AppState {
        config: Arc::new(config),
        db: Arc::new(db),
    };

    let auth_state = Arc::new(AuthState::from_config(&state.config));
    let user_state = Arc::new(UserState {
        db: state.db.clone(),
        auth: auth_state.clone(),
        password_hash_iterations: state.config.password_hash_iterations,
    });
    let task_state = Arc::new(TaskState {
        db: state.db.clone(),
    });

    let api_router = api::create_api_router(auth_state, user_state, task_state);
    let cors_layer = cors_layer(&state.config);

    Router::new()
        .route("/api/health", axum::routing::get(health_check_handler))
        .with_state(state)
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api::ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetSensitiveRequestHeadersLayer::new([header::AUTHORIZATION]))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer),
        )
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins()
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Handler for GET /api/health - Reports whether the database is reachable.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service and database are up", body = HealthResponse),
        (status = 500, description = "Database is unreachable", body = HealthResponse)
    ),
    tag = "Health"
)]
pub async fn health_check_handler(
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    match state.db.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "OK".to_string(),
                database: "connected".to_string(),
                timestamp: Utc::now(),
                environment: state.config.environment.clone(),
                error: None,
            }),
        ),
        Err(err) => {
            tracing::error!("Health check failed: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HealthResponse {
                    status: "ERROR".to_string(),
                    database: "disconnected".to_string(),
                    timestamp: Utc::now(),
                    environment: state.config.environment.clone(),
                    error: Some(err.to_string()),
                }),
            )
        }
    }
}
