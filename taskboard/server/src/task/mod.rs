use crate::entities::sea_orm_active_enums;
use crate::entities::*;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

pub mod api;

/// Minimum number of characters in a task title.
pub const TITLE_MIN_CHARS: usize = 3;
/// Maximum number of characters in a task title.
pub const TITLE_MAX_CHARS: usize = 255;

/// Lifecycle status of a task.
///
/// Any status may move to any other status; the store imposes no transition rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "Todo")]
    Todo,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::Completed,
    ];

    /// Returns the wire representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "Todo",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
        }
    }

    /// The next step in the usual Todo -> In Progress -> Completed flow, if any.
    pub fn conventional_next(&self) -> Option<TaskStatus> {
        match self {
            TaskStatus::Todo => Some(TaskStatus::InProgress),
            TaskStatus::InProgress => Some(TaskStatus::Completed),
            TaskStatus::Completed => None,
        }
    }

    /// The previous step in the usual flow, if any.
    pub fn conventional_previous(&self) -> Option<TaskStatus> {
        match self {
            TaskStatus::Todo => None,
            TaskStatus::InProgress => Some(TaskStatus::Todo),
            TaskStatus::Completed => Some(TaskStatus::InProgress),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = TaskServiceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| {
                TaskServiceError::Validation(format!(
                    "Invalid status '{}', expected one of: Todo, In Progress, Completed",
                    value
                ))
            })
    }
}

impl From<sea_orm_active_enums::TaskStatus> for TaskStatus {
    fn from(status: sea_orm_active_enums::TaskStatus) -> Self {
        match status {
            sea_orm_active_enums::TaskStatus::Todo => TaskStatus::Todo,
            sea_orm_active_enums::TaskStatus::InProgress => TaskStatus::InProgress,
            sea_orm_active_enums::TaskStatus::Completed => TaskStatus::Completed,
        }
    }
}

impl From<TaskStatus> for sea_orm_active_enums::TaskStatus {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Todo => sea_orm_active_enums::TaskStatus::Todo,
            TaskStatus::InProgress => sea_orm_active_enums::TaskStatus::InProgress,
            TaskStatus::Completed => sea_orm_active_enums::TaskStatus::Completed,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Eq)]
pub struct Task {
    id: Uuid,
    title: String,
    status: TaskStatus,
    user_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(
        id: Uuid,
        title: String,
        status: TaskStatus,
        user_id: Uuid,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title,
            status,
            user_id,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the ID of the owning user.
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl From<task::Model> for Task {
    fn from(model: task::Model) -> Self {
        Task::new(
            model.id,
            model.title,
            model.status.into(),
            model.user_id,
            model.created_at.with_timezone(&Utc),
            model.updated_at.with_timezone(&Utc),
        )
    }
}

/// Fields accepted when creating a task.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct NewTask {
    /// Task title, 3 to 255 characters
    pub title: Option<String>,
    /// Initial status, defaults to "Todo"
    #[schema(example = "Todo")]
    pub status: Option<String>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            status: None,
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }
}

/// Partial update of a task. Absent fields are left untouched.
///
/// The outer `Option` records presence, the inner one an explicit `null`,
/// which is rejected since neither field may be cleared.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct TaskPatch {
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>, example = "Completed")]
    pub status: Option<Option<String>>,
}

impl TaskPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(Some(title.into())),
            status: None,
        }
    }

    pub fn status(status: impl Into<String>) -> Self {
        Self {
            title: None,
            status: Some(Some(status.into())),
        }
    }
}

/// Marks a field as present even when its value is `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Number of tasks per status. All three statuses are always reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TaskStats {
    #[serde(rename = "Todo")]
    pub todo: u64,
    #[serde(rename = "In Progress")]
    pub in_progress: u64,
    #[serde(rename = "Completed")]
    pub completed: u64,
}

impl TaskStats {
    pub fn count(&self, status: TaskStatus) -> u64 {
        match status {
            TaskStatus::Todo => self.todo,
            TaskStatus::InProgress => self.in_progress,
            TaskStatus::Completed => self.completed,
        }
    }

    pub fn total(&self) -> u64 {
        self.todo + self.in_progress + self.completed
    }

    fn record(&mut self, status: TaskStatus, count: u64) {
        match status {
            TaskStatus::Todo => self.todo = count,
            TaskStatus::InProgress => self.in_progress = count,
            TaskStatus::Completed => self.completed = count,
        }
    }
}

/// Error type for TaskService operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskServiceError {
    /// Input failed validation. The message is safe to show to the caller.
    #[error("{0}")]
    Validation(String),
    /// No task with the given ID is owned by the caller.
    #[error("Task not found")]
    NotFound,
    /// The owner no longer exists, typically a token that outlived its account.
    #[error("Account no longer exists")]
    OwnerMissing,
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Checks the title length and blank constraints.
pub fn validate_title(title: &str) -> Result<(), TaskServiceError> {
    if title.trim().is_empty() {
        return Err(TaskServiceError::Validation(
            "Title must not be empty".to_string(),
        ));
    }
    let length = title.chars().count();
    if !(TITLE_MIN_CHARS..=TITLE_MAX_CHARS).contains(&length) {
        return Err(TaskServiceError::Validation(format!(
            "Title must be between {} and {} characters",
            TITLE_MIN_CHARS, TITLE_MAX_CHARS
        )));
    }
    Ok(())
}

fn parse_status(status: Option<&str>) -> Result<Option<TaskStatus>, TaskServiceError> {
    status.map(TaskStatus::from_str).transpose()
}

#[derive(Clone)]
pub struct TaskState {
    pub db: Arc<DatabaseConnection>,
}

/// Ownership-scoped access to the tasks table. Every operation takes the owner explicitly.
pub struct TaskService<'a> {
    db: &'a DatabaseConnection,
}

impl TaskService<'_> {
    pub fn new(db: &DatabaseConnection) -> TaskService<'_> {
        TaskService { db }
    }

    /// Creates a task owned by `owner`.
    ///
    /// # Arguments
    ///
    /// * `owner` - The ID of the authenticated user.
    /// * `new_task` - Title and optional initial status.
    ///
    /// # Returns
    ///
    /// The created `Task`, or `TaskServiceError::Validation` if the input is invalid.
    #[tracing::instrument(skip(self))]
    pub async fn create_task(
        &self,
        owner: Uuid,
        new_task: NewTask,
    ) -> Result<Task, TaskServiceError> {
        let title = new_task
            .title
            .ok_or_else(|| TaskServiceError::Validation("Title is required".to_string()))?;
        validate_title(&title)?;
        let status = parse_status(new_task.status.as_deref())?.unwrap_or_default();

        let now = Utc::now().fixed_offset();
        let active_model = task::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            title: ActiveValue::Set(title),
            status: ActiveValue::Set(status.into()),
            user_id: ActiveValue::Set(owner),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        };
        let created_model = active_model
            .insert(self.db)
            .await
            .map_err(|err| match err.sql_err() {
                Some(SqlErr::ForeignKeyConstraintViolation(_)) => TaskServiceError::OwnerMissing,
                _ => TaskServiceError::Database(err),
            })?;
        tracing::info!(task_id = %created_model.id, "Created task");
        Ok(Task::from(created_model))
    }

    /// Retrieves every task owned by `owner`, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_tasks(&self, owner: Uuid) -> Result<Vec<Task>, TaskServiceError> {
        let tasks = task::Entity::find()
            .filter(task::Column::UserId.eq(owner))
            .order_by_desc(task::Column::CreatedAt)
            .all(self.db)
            .await?
            .into_iter()
            .map(Task::from)
            .collect();
        Ok(tasks)
    }

    /// Counts the tasks owned by `owner` per status.
    #[tracing::instrument(skip(self))]
    pub async fn task_stats(&self, owner: Uuid) -> Result<TaskStats, TaskServiceError> {
        let counts: Vec<(sea_orm_active_enums::TaskStatus, i64)> = task::Entity::find()
            .select_only()
            .column(task::Column::Status)
            .column_as(Expr::col(task::Column::Id).count(), "count")
            .filter(task::Column::UserId.eq(owner))
            .group_by(task::Column::Status)
            .into_tuple()
            .all(self.db)
            .await?;

        let mut stats = TaskStats::default();
        for (status, count) in counts {
            stats.record(status.into(), count.max(0) as u64);
        }
        Ok(stats)
    }

    /// Retrieves a single task, provided it is owned by `owner`.
    #[tracing::instrument(skip(self))]
    pub async fn get_task(&self, id: Uuid, owner: Uuid) -> Result<Task, TaskServiceError> {
        self.find_owned(id, owner).await.map(Task::from)
    }

    /// Applies `patch` to the task with the given ID owned by `owner`.
    ///
    /// # Returns
    ///
    /// The updated `Task`. A task owned by someone else is reported as `NotFound`.
    #[tracing::instrument(skip(self))]
    pub async fn update_task(
        &self,
        id: Uuid,
        owner: Uuid,
        patch: TaskPatch,
    ) -> Result<Task, TaskServiceError> {
        let task_to_update = self.find_owned(id, owner).await?;

        let title = match patch.title {
            Some(Some(title)) => {
                validate_title(&title)?;
                Some(title)
            }
            Some(None) => {
                return Err(TaskServiceError::Validation("Title is required".to_string()));
            }
            None => None,
        };
        let status = match patch.status {
            Some(Some(status)) => Some(status.parse::<TaskStatus>()?),
            Some(None) => {
                return Err(TaskServiceError::Validation("Status is required".to_string()));
            }
            None => None,
        };

        let mut active_model: task::ActiveModel = task_to_update.into();
        if let Some(title) = title {
            active_model.title = ActiveValue::Set(title);
        }
        if let Some(status) = status {
            active_model.status = ActiveValue::Set(status.into());
        }
        active_model.updated_at = ActiveValue::Set(Utc::now().fixed_offset());
        let updated_model = active_model.update(self.db).await?;

        Ok(Task::from(updated_model))
    }

    /// Permanently deletes the task with the given ID owned by `owner`.
    #[tracing::instrument(skip(self))]
    pub async fn delete_task(&self, id: Uuid, owner: Uuid) -> Result<(), TaskServiceError> {
        let result = task::Entity::delete_many()
            .filter(task::Column::Id.eq(id))
            .filter(task::Column::UserId.eq(owner))
            .exec(self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(TaskServiceError::NotFound);
        }
        tracing::info!(task_id = %id, "Deleted task");
        Ok(())
    }

    async fn find_owned(&self, id: Uuid, owner: Uuid) -> Result<task::Model, TaskServiceError> {
        task::Entity::find_by_id(id)
            .filter(task::Column::UserId.eq(owner))
            .one(self.db)
            .await?
            .ok_or(TaskServiceError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_accept_titles_within_bounds() {
        assert!(validate_title("abc").is_ok());
        assert!(validate_title(&"a".repeat(TITLE_MAX_CHARS)).is_ok());
        assert!(validate_title("Buy milk").is_ok());
    }

    #[test]
    fn can_reject_titles_out_of_bounds() {
        assert!(matches!(
            validate_title("ab"),
            Err(TaskServiceError::Validation(_))
        ));
        assert!(matches!(
            validate_title(&"a".repeat(TITLE_MAX_CHARS + 1)),
            Err(TaskServiceError::Validation(_))
        ));
    }

    #[test]
    fn can_reject_blank_titles() {
        let result = validate_title("    ");
        assert_eq!(result.unwrap_err().to_string(), "Title must not be empty");
    }

    #[test]
    fn counts_title_length_in_characters() {
        // Three characters, nine bytes.
        assert!(validate_title("日本語").is_ok());
        assert!(validate_title(&"é".repeat(TITLE_MAX_CHARS)).is_ok());
    }

    #[test]
    fn can_parse_status_wire_values() {
        assert_eq!("Todo".parse::<TaskStatus>().unwrap(), TaskStatus::Todo);
        assert_eq!(
            "In Progress".parse::<TaskStatus>().unwrap(),
            TaskStatus::InProgress
        );
        assert_eq!(
            "Completed".parse::<TaskStatus>().unwrap(),
            TaskStatus::Completed
        );
    }

    #[test]
    fn can_reject_unknown_status() {
        let err = "Done".parse::<TaskStatus>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid status 'Done', expected one of: Todo, In Progress, Completed"
        );
        assert!("in progress".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn serializes_status_with_spaces() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"In Progress\""
        );
    }

    #[test]
    fn conventional_flow_is_linear() {
        assert_eq!(
            TaskStatus::Todo.conventional_next(),
            Some(TaskStatus::InProgress)
        );
        assert_eq!(TaskStatus::Completed.conventional_next(), None);
        assert_eq!(TaskStatus::Todo.conventional_previous(), None);
        assert_eq!(
            TaskStatus::Completed.conventional_previous(),
            Some(TaskStatus::InProgress)
        );
    }

    #[test]
    fn stats_always_report_all_statuses() {
        let value = serde_json::to_value(TaskStats::default()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"Todo": 0, "In Progress": 0, "Completed": 0})
        );
    }

    #[test]
    fn stats_total_sums_every_status() {
        let mut stats = TaskStats::default();
        stats.record(TaskStatus::Todo, 2);
        stats.record(TaskStatus::Completed, 3);
        assert_eq!(stats.total(), 5);
        assert_eq!(stats.count(TaskStatus::InProgress), 0);
    }
}
