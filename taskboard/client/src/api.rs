use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::{ClientError, api_error};
use crate::model::{NewTask, Task, TaskPatch, TaskStats};

/// Task operations exposed by the server for the authenticated user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskApi {
    /// Lists the caller's tasks, newest first.
    async fn list_tasks(&self) -> Result<Vec<Task>, ClientError>;
    async fn task_stats(&self) -> Result<TaskStats, ClientError>;
    async fn create_task(&self, new_task: &NewTask) -> Result<Task, ClientError>;
    async fn update_task(&self, id: Uuid, patch: &TaskPatch) -> Result<Task, ClientError>;
    async fn delete_task(&self, id: Uuid) -> Result<(), ClientError>;
}

/// [`TaskApi`] over HTTP with a bearer token.
#[derive(Clone)]
pub struct HttpTaskApi {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpTaskApi {
    /// `base_url` is the API root, e.g. `http://localhost:5000/api`.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url, token)
    }

    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.token)
    }
}

/// Sends a request and decodes a JSON success body.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
) -> Result<T, ClientError> {
    let response = request.send().await?;
    if !response.status().is_success() {
        return Err(api_error(response).await);
    }
    Ok(response.json().await?)
}

#[async_trait]
impl TaskApi for HttpTaskApi {
    #[tracing::instrument(skip(self))]
    async fn list_tasks(&self) -> Result<Vec<Task>, ClientError> {
        send_json(self.authorized(self.client.get(self.url("/tasks")))).await
    }

    #[tracing::instrument(skip(self))]
    async fn task_stats(&self) -> Result<TaskStats, ClientError> {
        send_json(self.authorized(self.client.get(self.url("/tasks/stats")))).await
    }

    #[tracing::instrument(skip(self))]
    async fn create_task(&self, new_task: &NewTask) -> Result<Task, ClientError> {
        let request = self.client.post(self.url("/tasks")).json(new_task);
        send_json(self.authorized(request)).await
    }

    #[tracing::instrument(skip(self))]
    async fn update_task(&self, id: Uuid, patch: &TaskPatch) -> Result<Task, ClientError> {
        let request = self
            .client
            .put(self.url(&format!("/tasks/{}", id)))
            .json(patch);
        send_json(self.authorized(request)).await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_task(&self, id: Uuid) -> Result<(), ClientError> {
        let request = self.client.delete(self.url(&format!("/tasks/{}", id)));
        let response = self.authorized(request).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_paths_without_double_slash() {
        let api = HttpTaskApi::new("http://localhost:5000/api/", "token");
        assert_eq!(api.url("/tasks"), "http://localhost:5000/api/tasks");
    }
}
