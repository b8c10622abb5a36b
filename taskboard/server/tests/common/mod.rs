#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use chrono::{DateTime, Duration, Utc};
use migration::MigratorTrait;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use taskboard_server::auth::encode_jwt;
use taskboard_server::config::Config;
use taskboard_server::entities::{sea_orm_active_enums, task, user};
use testcontainers_modules::testcontainers::runners::AsyncRunner;
use testcontainers_modules::{postgres, testcontainers};
use uuid::Uuid;

pub const JWT_SECRET: &str = "test_secret";
/// Low iteration count so password hashing stays fast in debug builds.
pub const HASH_ITERATIONS: u32 = 1_000;

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        port: 5000,
        jwt_secret: JWT_SECRET.to_string(),
        jwt_ttl_hours: 1,
        allowed_origins: String::new(),
        password_hash_iterations: HASH_ITERATIONS,
        environment: "test".to_string(),
    }
}

/// Opens a migrated in-memory SQLite database.
///
/// The pool is pinned to a single connection because every SQLite memory
/// connection is its own database.
pub async fn setup_sqlite_db() -> anyhow::Result<DatabaseConnection> {
    // Allow multiple calls to init for tests.
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

pub async fn setup_container() -> anyhow::Result<testcontainers::ContainerAsync<postgres::Postgres>>
{
    let container = postgres::Postgres::default().start().await?;
    Ok(container)
}

pub async fn setup_db(
    container: &testcontainers::ContainerAsync<postgres::Postgres>,
) -> anyhow::Result<DatabaseConnection> {
    let host = container.get_host().await?;
    let port = container.get_host_port_ipv4(5432).await?;
    let db_url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);
    let db = Database::connect(&db_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// Inserts a user row directly and returns its ID.
pub async fn insert_user(db: &DatabaseConnection, email: &str) -> Uuid {
    let now = Utc::now().fixed_offset();
    let model = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Test User".to_string()),
        email: Set(email.to_string()),
        password_hash: Set("pbkdf2-sha256$1$00$00".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap();
    model.id
}

/// Inserts a task row directly with an explicit creation time.
pub async fn insert_task(
    db: &DatabaseConnection,
    owner: Uuid,
    title: &str,
    status: sea_orm_active_enums::TaskStatus,
    created_at: DateTime<Utc>,
) -> Uuid {
    let model = task::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title.to_string()),
        status: Set(status),
        user_id: Set(owner),
        created_at: Set(created_at.fixed_offset()),
        updated_at: Set(created_at.fixed_offset()),
    }
    .insert(db)
    .await
    .unwrap();
    model.id
}

/// A fixed reference time plus `minutes`, so ordering in tests never depends on the clock.
pub fn minutes_after_epoch(minutes: i64) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
        + Duration::minutes(minutes)
}

pub async fn bearer_for(user_id: Uuid) -> String {
    let token = encode_jwt(
        user_id,
        format!("{}@example.com", user_id),
        JWT_SECRET,
        Duration::hours(1),
    )
    .await
    .unwrap();
    format!("Bearer {}", token)
}

pub fn json_request(
    method: &str,
    uri: &str,
    bearer: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(bearer) = bearer {
        builder = builder.header("authorization", bearer);
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn read_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
