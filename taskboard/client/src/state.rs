use uuid::Uuid;

use crate::api::TaskApi;
use crate::error::ClientError;
use crate::model::{NewTask, Task, TaskPatch, TaskStats};

const FETCH_TASKS_FAILED: &str = "Failed to fetch tasks";
const FETCH_STATS_FAILED: &str = "Failed to fetch stats";
const CREATE_TASK_FAILED: &str = "Failed to create task";
const UPDATE_TASK_FAILED: &str = "Failed to update task";
const DELETE_TASK_FAILED: &str = "Failed to delete task";

/// Client-side view of the signed-in user's tasks.
///
/// Stats are only ever taken from the server. Every successful mutation is
/// followed by a stats fetch. A failed call stores a message in `error` and
/// leaves the tasks and stats as they were.
pub struct TaskClientState<A> {
    api: A,
    tasks: Vec<Task>,
    stats: TaskStats,
    loading: bool,
    error: Option<String>,
}

impl<A: TaskApi> TaskClientState<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            tasks: Vec::new(),
            stats: TaskStats::default(),
            loading: false,
            error: None,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn stats(&self) -> TaskStats {
        self.stats
    }

    /// True while a task list fetch is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    #[tracing::instrument(skip(self))]
    pub async fn fetch_tasks(&mut self) -> Result<(), ClientError> {
        self.loading = true;
        self.error = None;
        let result = self.api.list_tasks().await;
        self.loading = false;
        match result {
            Ok(tasks) => {
                self.tasks = tasks;
                Ok(())
            }
            Err(err) => Err(self.record_failure(err, FETCH_TASKS_FAILED)),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn fetch_stats(&mut self) -> Result<(), ClientError> {
        let result = self.api.task_stats().await;
        match result {
            Ok(stats) => {
                self.stats = stats;
                Ok(())
            }
            Err(err) => Err(self.record_failure(err, FETCH_STATS_FAILED)),
        }
    }

    /// Creates a task and puts it at the top of the list.
    #[tracing::instrument(skip(self))]
    pub async fn create_task(&mut self, new_task: NewTask) -> Result<Task, ClientError> {
        let result = self.api.create_task(&new_task).await;
        let task = result.map_err(|err| self.record_failure(err, CREATE_TASK_FAILED))?;
        self.tasks.insert(0, task.clone());
        self.refresh_stats().await;
        Ok(task)
    }

    /// Updates a task and replaces the local copy where it sits.
    #[tracing::instrument(skip(self))]
    pub async fn update_task(&mut self, id: Uuid, patch: TaskPatch) -> Result<Task, ClientError> {
        let result = self.api.update_task(id, &patch).await;
        let task = result.map_err(|err| self.record_failure(err, UPDATE_TASK_FAILED))?;
        if let Some(slot) = self
            .tasks
            .iter_mut()
            .find(|existing| existing.id == task.id)
        {
            *slot = task.clone();
        }
        self.refresh_stats().await;
        Ok(task)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_task(&mut self, id: Uuid) -> Result<(), ClientError> {
        let result = self.api.delete_task(id).await;
        result.map_err(|err| self.record_failure(err, DELETE_TASK_FAILED))?;
        self.tasks.retain(|task| task.id != id);
        self.refresh_stats().await;
        Ok(())
    }

    // The mutation already succeeded, so a stats failure only lands in `error`.
    async fn refresh_stats(&mut self) {
        if let Err(err) = self.fetch_stats().await {
            tracing::warn!("Stats refresh failed: {}", err);
        }
    }

    fn record_failure(&mut self, err: ClientError, fallback: &str) -> ClientError {
        let message = err.server_message().unwrap_or(fallback).to_string();
        tracing::warn!("{}: {}", fallback, err);
        self.error = Some(message);
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockTaskApi;
    use crate::model::TaskStatus;
    use chrono::{TimeZone, Utc};
    use mockall::predicate::*;

    fn task(title: &str, status: TaskStatus, minute: u32) -> Task {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, minute, 0).unwrap();
        Task {
            id: Uuid::new_v4(),
            title: title.to_string(),
            status,
            user_id: Uuid::nil(),
            created_at: at,
            updated_at: at,
        }
    }

    fn api_error(status: u16, message: &str) -> ClientError {
        ClientError::Api {
            status,
            message: Some(message.to_string()),
        }
    }

    fn stats(todo: u64, in_progress: u64, completed: u64) -> TaskStats {
        TaskStats {
            todo,
            in_progress,
            completed,
        }
    }

    async fn loaded_state(mut api: MockTaskApi, tasks: Vec<Task>) -> TaskClientState<MockTaskApi> {
        api.expect_list_tasks()
            .times(1)
            .returning(move || Ok(tasks.clone()));
        let mut state = TaskClientState::new(api);
        state.fetch_tasks().await.unwrap();
        state
    }

    #[tokio::test]
    async fn fetch_tasks_replaces_list() {
        // Arrange
        let newer = task("Newer", TaskStatus::Todo, 5);
        let older = task("Older", TaskStatus::Completed, 1);
        let expected = vec![newer.clone(), older.clone()];

        // Act
        let state = loaded_state(MockTaskApi::new(), expected.clone()).await;

        // Assert
        assert_eq!(state.tasks(), expected.as_slice());
        assert!(!state.is_loading());
        assert_eq!(state.error(), None);
    }

    #[tokio::test]
    async fn fetch_tasks_failure_keeps_list_and_records_server_message() {
        // Arrange
        let existing = task("Existing", TaskStatus::Todo, 0);
        let mut api = MockTaskApi::new();
        let mut calls = 0;
        let first_page = vec![existing.clone()];
        api.expect_list_tasks().times(2).returning(move || {
            calls += 1;
            if calls == 1 {
                Ok(first_page.clone())
            } else {
                Err(api_error(500, "Database unavailable"))
            }
        });
        let mut state = TaskClientState::new(api);
        state.fetch_tasks().await.unwrap();

        // Act
        let result = state.fetch_tasks().await;

        // Assert
        assert!(result.is_err());
        assert_eq!(state.tasks(), &[existing]);
        assert_eq!(state.error(), Some("Database unavailable"));
        assert!(!state.is_loading());
    }

    #[tokio::test]
    async fn fetch_tasks_uses_fallback_message() {
        // Arrange
        let mut api = MockTaskApi::new();
        api.expect_list_tasks().times(1).returning(|| {
            Err(ClientError::Api {
                status: 502,
                message: None,
            })
        });
        let mut state = TaskClientState::new(api);

        // Act
        let _ = state.fetch_tasks().await;

        // Assert
        assert_eq!(state.error(), Some("Failed to fetch tasks"));
    }

    #[tokio::test]
    async fn fetch_tasks_clears_previous_error() {
        // Arrange
        let mut api = MockTaskApi::new();
        api.expect_delete_task()
            .times(1)
            .returning(|_| Err(api_error(404, "Task not found")));
        api.expect_list_tasks()
            .times(1)
            .returning(|| Ok(Vec::new()));
        let mut state = TaskClientState::new(api);
        let _ = state.delete_task(Uuid::new_v4()).await;
        assert_eq!(state.error(), Some("Task not found"));

        // Act
        state.fetch_tasks().await.unwrap();

        // Assert
        assert_eq!(state.error(), None);
    }

    #[tokio::test]
    async fn create_task_prepends_and_refreshes_stats() {
        // Arrange
        let existing = task("Existing", TaskStatus::Completed, 0);
        let created = task("Buy milk", TaskStatus::Todo, 10);
        let mut api = MockTaskApi::new();
        let returned = created.clone();
        api.expect_create_task()
            .withf(|new_task: &NewTask| {
                new_task.title == "Buy milk" && new_task.status.is_none()
            })
            .times(1)
            .returning(move |_| Ok(returned.clone()));
        api.expect_task_stats()
            .times(1)
            .returning(|| Ok(stats(1, 0, 1)));
        let mut state = loaded_state(api, vec![existing.clone()]).await;

        // Act
        let result = state
            .create_task(NewTask::titled("Buy milk"))
            .await
            .unwrap();

        // Assert
        assert_eq!(result, created);
        assert_eq!(state.tasks(), &[created, existing]);
        assert_eq!(state.stats(), stats(1, 0, 1));
    }

    #[tokio::test]
    async fn create_task_failure_keeps_state_and_skips_stats() {
        // Arrange
        let existing = task("Existing", TaskStatus::Todo, 0);
        let mut api = MockTaskApi::new();
        api.expect_create_task()
            .times(1)
            .returning(|_| Err(api_error(400, "Title must be between 3 and 255 characters")));
        api.expect_task_stats().times(0);
        let mut state = loaded_state(api, vec![existing.clone()]).await;

        // Act
        let result = state.create_task(NewTask::titled("ab")).await;

        // Assert
        assert!(result.is_err());
        assert_eq!(state.tasks(), &[existing]);
        assert_eq!(state.stats(), TaskStats::default());
        assert_eq!(
            state.error(),
            Some("Title must be between 3 and 255 characters")
        );
    }

    #[tokio::test]
    async fn update_task_replaces_in_place() {
        // Arrange
        let first = task("First", TaskStatus::Todo, 2);
        let second = task("Second", TaskStatus::Todo, 1);
        let mut completed = second.clone();
        completed.status = TaskStatus::Completed;
        let mut api = MockTaskApi::new();
        let returned = completed.clone();
        api.expect_update_task()
            .with(eq(second.id), eq(TaskPatch::status(TaskStatus::Completed)))
            .times(1)
            .returning(move |_, _| Ok(returned.clone()));
        api.expect_task_stats()
            .times(1)
            .returning(|| Ok(stats(1, 0, 1)));
        let mut state = loaded_state(api, vec![first.clone(), second.clone()]).await;

        // Act
        state
            .update_task(second.id, TaskPatch::status(TaskStatus::Completed))
            .await
            .unwrap();

        // Assert
        assert_eq!(state.tasks(), &[first, completed]);
        assert_eq!(state.stats(), stats(1, 0, 1));
    }

    #[tokio::test]
    async fn update_task_failure_uses_fallback_message() {
        // Arrange
        let existing = task("Existing", TaskStatus::Todo, 0);
        let mut api = MockTaskApi::new();
        api.expect_update_task().times(1).returning(|_, _| {
            Err(ClientError::Api {
                status: 500,
                message: None,
            })
        });
        let mut state = loaded_state(api, vec![existing.clone()]).await;

        // Act
        let result = state
            .update_task(existing.id, TaskPatch::title("Renamed"))
            .await;

        // Assert
        assert!(result.is_err());
        assert_eq!(state.tasks(), &[existing]);
        assert_eq!(state.error(), Some("Failed to update task"));
    }

    #[tokio::test]
    async fn delete_task_removes_entry_and_refreshes_stats() {
        // Arrange
        let keep = task("Keep", TaskStatus::Todo, 1);
        let remove = task("Remove", TaskStatus::InProgress, 0);
        let mut api = MockTaskApi::new();
        api.expect_delete_task()
            .with(eq(remove.id))
            .times(1)
            .returning(|_| Ok(()));
        api.expect_task_stats()
            .times(1)
            .returning(|| Ok(stats(1, 0, 0)));
        let mut state = loaded_state(api, vec![keep.clone(), remove.clone()]).await;

        // Act
        state.delete_task(remove.id).await.unwrap();

        // Assert
        assert_eq!(state.tasks(), &[keep]);
        assert_eq!(state.stats(), stats(1, 0, 0));
    }

    #[tokio::test]
    async fn stats_failure_after_mutation_is_recorded() {
        // Arrange
        let created = task("Buy milk", TaskStatus::Todo, 0);
        let mut api = MockTaskApi::new();
        let returned = created.clone();
        api.expect_create_task()
            .times(1)
            .returning(move |_| Ok(returned.clone()));
        api.expect_task_stats().times(1).returning(|| {
            Err(ClientError::Api {
                status: 500,
                message: None,
            })
        });
        let mut state = TaskClientState::new(api);

        // Act
        let result = state.create_task(NewTask::titled("Buy milk")).await;

        // Assert
        assert!(result.is_ok());
        assert_eq!(state.tasks(), &[created]);
        assert_eq!(state.stats(), TaskStats::default());
        assert_eq!(state.error(), Some("Failed to fetch stats"));
    }

    #[tokio::test]
    async fn clear_error_resets_message() {
        // Arrange
        let mut api = MockTaskApi::new();
        api.expect_task_stats()
            .times(1)
            .returning(|| Err(api_error(401, "Token expired")));
        let mut state = TaskClientState::new(api);
        let _ = state.fetch_stats().await;

        // Act
        state.clear_error();

        // Assert
        assert_eq!(state.error(), None);
    }
}
